//! Sensor schema matching.
//!
//! A module's schema is a list of [`SensorSpec`]s: an output key, the label
//! synonyms it may appear under, and how to interpret the value. Matching a
//! page against a schema always yields a record with exactly the schema's
//! keys, so firmware that omits a row degrades to a sentinel instead of a
//! missing field.

mod tables;

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use scraper::{Html, Selector};

pub use tables::{endpoints, sensors};

use crate::html::kv::{element_text, extract_kv_from, row_cells};
use crate::html::text::{line_after, normalize_spaces, page_lines, to_int_or_none};
use crate::model::{Module, ModuleRecord, SensorValue};

/// How a resolved label value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Normalized text, `"n/a"` when missing.
    Text,
    /// Integer reading, `None` when missing or unparseable.
    Measurement,
}

/// One output field of a module schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSpec {
    pub key: &'static str,
    /// Candidate labels, first match wins.
    pub labels: &'static [&'static str],
    pub kind: ValueKind,
}

impl SensorSpec {
    /// Sentinel of this field's kind.
    pub fn unknown(&self) -> SensorValue {
        match self.kind {
            ValueKind::Text => SensorValue::unknown_text(),
            ValueKind::Measurement => SensorValue::Integer(None),
        }
    }

    /// Interpret the raw text found under one of the labels.
    pub fn resolve(&self, raw: Option<&str>) -> SensorValue {
        match (self.kind, raw) {
            (ValueKind::Text, Some(raw)) => {
                let clean = normalize_spaces(raw);
                if clean.is_empty() {
                    self.unknown()
                } else {
                    SensorValue::Text(clean)
                }
            }
            (ValueKind::Measurement, Some(raw)) => SensorValue::Integer(to_int_or_none(raw)),
            (_, None) => self.unknown(),
        }
    }
}

/// Exact-then-case-insensitive label lookup over an extracted map.
struct Lookup<'a> {
    exact: &'a IndexMap<String, String>,
    folded: HashMap<String, &'a str>,
}

impl<'a> Lookup<'a> {
    fn new(exact: &'a IndexMap<String, String>) -> Self {
        let mut folded = HashMap::with_capacity(exact.len());
        for (k, v) in exact {
            folded.entry(k.to_lowercase()).or_insert(v.as_str());
        }
        Self { exact, folded }
    }

    fn get(&self, label: &str) -> Option<&'a str> {
        self.exact
            .get(label)
            .map(String::as_str)
            .or_else(|| self.folded.get(&label.to_lowercase()).copied())
    }

    fn first_of(&self, labels: &[&str]) -> Option<&'a str> {
        labels.iter().find_map(|l| self.get(l))
    }
}

/// Resolve `specs` against `html`, applying the module-specific fixups.
pub fn match_module(module: Module, html: &str, specs: &[SensorSpec]) -> ModuleRecord {
    let doc = (!html.trim().is_empty()).then(|| Html::parse_document(html));
    let kv = doc.as_ref().map(extract_kv_from).unwrap_or_default();
    let lookup = Lookup::new(&kv);

    let mut record = ModuleRecord::new();
    for spec in specs {
        record.insert(spec.key, spec.resolve(lookup.first_of(spec.labels)));
    }

    match module {
        Module::Gsm => split_combined_bandwidth(&lookup, &mut record),
        Module::Mesh => force_integer(&mut record, "units"),
        Module::Devices => {
            if let Some(doc) = &doc {
                apply_device_counts(doc, &mut record);
            }
        }
        Module::System => apply_line_fallbacks(html, specs, &mut record),
        _ => {}
    }

    record
}

/// Match `html` against the built-in schema of `module`.
pub fn match_builtin(module: Module, html: &str) -> ModuleRecord {
    match_module(module, html, sensors(module))
}

/// Overwrite `key` only if the schema declared it.
fn set_declared(record: &mut ModuleRecord, key: &str, value: SensorValue) {
    if record.get(key).is_some() {
        record.insert(key, value);
    }
}

// ── Module fixups ───────────────────────────────────────────────────

fn split_combined_bandwidth(lookup: &Lookup<'_>, record: &mut ModuleRecord) {
    if lookup.get("Upload").is_some() || lookup.get("Download").is_some() {
        return;
    }
    let Some(combined) = lookup.get("Upload / Download") else {
        return;
    };

    let combined = normalize_spaces(combined);
    let separator = if combined.contains(" / ") { " / " } else { "/" };
    let mut parts = combined.splitn(2, separator).map(str::trim);

    let mut next = || match parts.next() {
        Some(p) if !p.is_empty() => SensorValue::Text(p.to_owned()),
        _ => SensorValue::unknown_text(),
    };
    let upload = next();
    let download = next();
    set_declared(record, "upload", upload);
    set_declared(record, "download", download);
}

fn force_integer(record: &mut ModuleRecord, key: &str) {
    let Some(current) = record.get(key) else {
        return;
    };
    let value = match current {
        SensorValue::Text(s) => to_int_or_none(s),
        SensorValue::Integer(n) => *n,
    };
    record.insert(key, SensorValue::Integer(value));
}

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("table selector is valid"));
static HEADER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead th").expect("header selector is valid"));
static BODY_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").expect("body row selector is valid"));
static DEVICES_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^devices\s*\|\s*(\d+)$").expect("devices heading regex is valid")
});

/// Category of a per-connection-type count row, by its label.
fn count_category(label: &str) -> Option<&'static str> {
    match label {
        "online" | "online devices" | "connected" => return Some("online"),
        "blocked" | "blocked devices" => return Some("blocked"),
        _ => {}
    }
    if label.contains("2.4") {
        Some("wifi_24")
    } else if label.contains("5g") || label.contains("5ghz") || label.contains("5 ghz") {
        Some("wifi_5")
    } else if label.contains("wired") || label.contains("ethernet") || label.contains("lan") {
        Some("wired")
    } else if label.contains("mesh") {
        Some("mesh")
    } else {
        None
    }
}

/// Devices summary: a `Devices | N` header is authoritative for the total,
/// body rows fill the per-type counts.
fn apply_device_counts(doc: &Html, record: &mut ModuleRecord) {
    let header_total = doc.select(&TABLE).find_map(|table| {
        let header: Vec<String> = table.select(&HEADER_CELL).map(element_text).collect();
        match header.as_slice() {
            [label, total, ..] if label.to_lowercase().starts_with("devices") => {
                to_int_or_none(total)
            }
            _ => None,
        }
    });
    let total = header_total.or_else(|| {
        let text = doc.root_element().text().collect::<Vec<_>>().join("\n");
        text.lines().find_map(|line| {
            DEVICES_HEADING
                .captures(&normalize_spaces(line))
                .and_then(|c| to_int_or_none(&c[1]))
        })
    });
    if let Some(total) = total {
        set_declared(record, "device_count", SensorValue::Integer(Some(total)));
    }

    for row in doc.select(&BODY_ROW) {
        let cells = row_cells(row);
        let [label, value, ..] = cells.as_slice() else {
            continue;
        };
        let Some(count) = to_int_or_none(&element_text(*value)) else {
            continue;
        };
        if let Some(key) = count_category(&element_text(*label).to_lowercase()) {
            set_declared(record, key, SensorValue::Integer(Some(count)));
        }
    }
}

/// Uptime and local time rendered as bare text lines outside any table.
fn apply_line_fallbacks(html: &str, specs: &[SensorSpec], record: &mut ModuleRecord) {
    let pending: Vec<&SensorSpec> = specs
        .iter()
        .filter(|s| matches!(s.key, "uptime" | "local_time"))
        .filter(|s| record.get(s.key).is_none_or(SensorValue::is_unknown))
        .collect();
    if pending.is_empty() {
        return;
    }

    let lines = page_lines(html);
    for spec in pending {
        if let Some(value) = spec.labels.iter().find_map(|l| line_after(&lines, l)) {
            record.insert(spec.key, spec.resolve(Some(value)));
        }
    }
}
