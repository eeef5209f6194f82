//! Snapshot and model detection handlers.

use cudy_core::{DetectedModel, Module, ModuleData, ModuleRecord, Router, Snapshot, UNKNOWN};
use tabled::Tabled;

use crate::cli::{GlobalOpts, OutputFormat, SnapshotArgs};
use crate::error::CliError;
use crate::output;

use super::devices;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SensorRow {
    #[tabled(rename = "Sensor")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn record_table(record: &ModuleRecord) -> String {
    let rows: Vec<SensorRow> = record
        .iter()
        .map(|(key, value)| SensorRow {
            key: key.to_owned(),
            value: value.to_string(),
        })
        .collect();
    output::render_table(&rows)
}

fn module_detail(module: Module, data: &ModuleData) -> String {
    let body = match data {
        ModuleData::Record(record) => record_table(record),
        ModuleData::Devices(list) => devices::device_table(list),
    };
    format!("{module}\n{body}")
}

fn module_plain(module: Module, data: &ModuleData) -> Vec<String> {
    match data {
        ModuleData::Record(record) => record
            .iter()
            .map(|(key, value)| format!("{module}.{key}={value}"))
            .collect(),
        ModuleData::Devices(list) => list
            .iter()
            .map(|d| format!("{module}.{}={}", d.mac, d.hostname))
            .collect(),
    }
}

fn snapshot_detail(snapshot: &Snapshot) -> String {
    snapshot
        .iter()
        .map(|(module, data)| module_detail(module, data))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn snapshot_plain(snapshot: &Snapshot) -> String {
    snapshot
        .iter()
        .flat_map(|(module, data)| module_plain(module, data))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a whole snapshot in `format`.
pub fn render(format: &OutputFormat, snapshot: &Snapshot) -> String {
    output::render_single(format, snapshot, snapshot_detail, snapshot_plain)
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn handle(router: &Router, args: &SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = router.snapshot();

    let out = match args.module {
        Some(module) => {
            let data = snapshot.get(module).ok_or_else(|| CliError::Validation {
                field: "module".into(),
                reason: format!("router did not report {module}"),
            })?;
            output::render_single(
                &global.output,
                data,
                |d| module_detail(module, d),
                |d| module_plain(module, d).join("\n"),
            )
        }
        None => render(&global.output, &snapshot),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn detect(router: &Router, global: &GlobalOpts) -> Result<(), CliError> {
    let model = router
        .model()
        .ok_or_else(|| CliError::Internal("model was not resolved".into()))?;
    let out = output::render_single(
        &global.output,
        &model,
        |m: &DetectedModel| {
            format!(
                "Model:    {}\nProfile:  {}",
                m.raw.as_deref().unwrap_or(UNKNOWN),
                m.family
            )
        },
        |m| m.family.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
