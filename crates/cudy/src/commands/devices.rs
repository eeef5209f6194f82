//! Device command handlers.

use cudy_core::{DeviceRecord, Router};
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Link")]
    connection_type: String,
    #[tabled(rename = "Signal")]
    signal: String,
    #[tabled(rename = "Up")]
    upload: String,
    #[tabled(rename = "Down")]
    download: String,
    #[tabled(rename = "Online")]
    online_time: String,
}

impl From<&DeviceRecord> for DeviceRow {
    fn from(d: &DeviceRecord) -> Self {
        Self {
            hostname: d.hostname.clone(),
            ip: d.ip.clone(),
            mac: d.mac.clone(),
            connection_type: d.connection_type.clone(),
            signal: d.signal.clone(),
            upload: d.upload_speed.clone(),
            download: d.download_speed.clone(),
            online_time: d.online_time.clone(),
        }
    }
}

/// Device list as a rounded table.
pub fn device_table(devices: &[DeviceRecord]) -> String {
    let rows: Vec<DeviceRow> = devices.iter().map(DeviceRow::from).collect();
    output::render_table(&rows)
}

fn detail(d: &DeviceRecord) -> String {
    let internet = d
        .internet_access
        .map_or("-", |allowed| if allowed { "allowed" } else { "blocked" });
    [
        format!("Hostname: {}", d.hostname),
        format!("IP:       {}", d.ip),
        format!("MAC:      {}", d.mac),
        format!("Link:     {}", d.connection_type),
        format!("Signal:   {}", d.signal),
        format!("Up:       {}", d.upload_speed),
        format!("Down:     {}", d.download_speed),
        format!("Online:   {}", d.online_time),
        format!("Internet: {internet}"),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(router: &Router, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(DevicesCommand::List) {
        DevicesCommand::List => {
            let devices = router.devices();
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::from(d),
                |d| d.mac.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { mac } => {
            let device = router.device(&mac)?;
            let out = output::render_single(&global.output, &device, detail, |d| d.mac.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Present { mac } => {
            let device = router.device(&mac)?;
            util::note(&format!("{} is connected", device.hostname), global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_shows_unknown_internet_access() {
        let device = DeviceRecord {
            hostname: "laptop".into(),
            ..DeviceRecord::default()
        };
        let out = detail(&device);
        assert!(out.starts_with("Hostname: laptop"));
        assert!(out.ends_with("Internet: -"));
    }

    #[test]
    fn table_has_one_row_per_device() {
        let devices = vec![DeviceRecord::default(), DeviceRecord::default()];
        let out = device_table(&devices);
        assert_eq!(out.matches("n/a").count(), 16);
    }
}
