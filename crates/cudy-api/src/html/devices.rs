// Connected-devices table parser
//
// Column order differs between firmware builds, so fields are found by
// classifying tokens across the whole row rather than by position. Newer
// builds render every cell twice (a `hidden-xs` desktop copy and a mobile
// copy) and add an internet-access toggle icon.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::kv::{element_text, row_cells};
use super::text::{collapse_self_repeat, normalize_spaces};
use crate::model::{DeviceRecord, UNKNOWN};

const DEFAULT_ROW_SELECTORS: &[&str] = &[
    "table.table-striped tbody tr[id^='cbi-table-']",
    "table tbody tr[id^='cbi-table-']",
    "table tbody tr",
];

static DESKTOP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.hidden-xs").expect("desktop selector is valid"));
static TOGGLE_ON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("i.fa-toggle-on").expect("toggle selector is valid"));
static TOGGLE_OFF: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("i.fa-toggle-off").expect("toggle selector is valid"));

static TOKEN_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s/|]+").expect("token regex is valid"));
static MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}([:\-][0-9A-Fa-f]{2}){5}$").expect("mac regex is valid")
});
static MAC_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9A-Fa-f]{2}(?:[:\-][0-9A-Fa-f]{2}){5}").expect("mac regex is valid")
});
static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("ipv4 regex is valid"));
static SIGNAL_DBM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-\d{1,3})\s*dBm").expect("dbm regex is valid"));
static SIGNAL_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(-\d{1,3})(?:\s|$)").expect("signal regex is valid"));
static UPLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"↑\s*([\d.]+)\s*([A-Za-z/]+)").expect("upload regex is valid"));
static DOWNLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"↓\s*([\d.]+)\s*([A-Za-z/]+)").expect("download regex is valid"));
static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+d\s*)?\d{1,2}:\d{2}:\d{2}").expect("duration regex is valid")
});

/// Parse the device list from a devices page.
///
/// `row_selector` overrides the built-in row patterns. Rows with fewer
/// than two cells are skipped; every other row yields a record, with
/// unresolved fields set to `"n/a"`.
pub fn parse_device_table(html: &str, row_selector: Option<&str>) -> Vec<DeviceRecord> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let doc = Html::parse_document(html);
    select_rows(&doc, row_selector)
        .into_iter()
        .filter_map(parse_row)
        .collect()
}

fn select_rows<'a>(doc: &'a Html, row_selector: Option<&str>) -> Vec<ElementRef<'a>> {
    if let Some(raw) = row_selector {
        match Selector::parse(raw) {
            Ok(sel) => return doc.select(&sel).collect(),
            Err(e) => warn!(selector = raw, error = %e, "invalid device row selector"),
        }
    }
    for raw in DEFAULT_ROW_SELECTORS {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        let rows: Vec<_> = doc.select(&sel).collect();
        if !rows.is_empty() {
            debug!(selector = raw, rows = rows.len(), "device rows located");
            return rows;
        }
    }
    Vec::new()
}

fn parse_row(row: ElementRef<'_>) -> Option<DeviceRecord> {
    let cells = row_cells(row);
    if cells.len() < 2 {
        return None;
    }
    if row.select(&DESKTOP).next().is_some() {
        Some(parse_desktop_row(row, &cells))
    } else {
        Some(parse_plain_row(&cells))
    }
}

fn parse_plain_row(cells: &[ElementRef<'_>]) -> DeviceRecord {
    let texts: Vec<String> = cells.iter().map(|c| element_text(*c)).collect();
    let mut record = classify(&texts);

    if let Some(hostname) = cells.first().and_then(|c| first_line(*c)) {
        record.hostname = hostname;
    }
    if let Some(up) = texts.iter().find_map(|t| rate(&UPLOAD, t)) {
        record.upload_speed = up;
    }
    if let Some(down) = texts.iter().find_map(|t| rate(&DOWNLOAD, t)) {
        record.download_speed = down;
    }
    record
}

fn parse_desktop_row(row: ElementRef<'_>, cells: &[ElementRef<'_>]) -> DeviceRecord {
    let texts: Vec<String> = cells.iter().map(|c| desktop_text(*c)).collect();
    let mut record = classify(&texts);

    // the leading column is a row index
    if let Some(hostname) = cells
        .iter()
        .zip(&texts)
        .find(|(_, t)| !t.is_empty() && !t.chars().all(|c| c.is_ascii_digit()))
        .and_then(|(cell, _)| desktop_parts(*cell).into_iter().next())
    {
        record.hostname = hostname;
    }

    if let Some(speed) = texts.iter().find(|t| t.contains('↑') || t.contains('↓')) {
        if let Some(up) = rate(&UPLOAD, speed) {
            record.upload_speed = up;
        }
        if let Some(down) = rate(&DOWNLOAD, speed) {
            record.download_speed = down;
        }
    }

    record.internet_access = if row.select(&TOGGLE_ON).next().is_some() {
        Some(true)
    } else if row.select(&TOGGLE_OFF).next().is_some() {
        Some(false)
    } else {
        None
    };
    record
}

/// Row-wide token classification shared by both row layouts.
fn classify(texts: &[String]) -> DeviceRecord {
    let mut record = DeviceRecord::default();

    let tokens = || texts.iter().flat_map(|t| TOKEN_SPLIT.split(t));
    if let Some(mac) = tokens().find(|t| MAC.is_match(t)) {
        mac.clone_into(&mut record.mac);
    }
    if let Some(ip) = tokens().find(|t| IPV4.is_match(t)) {
        ip.clone_into(&mut record.ip);
    }
    if let Some(signal) = texts.iter().find_map(|t| signal(t)) {
        record.signal = signal;
    }
    // a MAC such as 12:34:56:78:9a:bc would otherwise read as a duration
    if let Some(online) = texts.iter().find_map(|t| {
        let without_macs = MAC_ANYWHERE.replace_all(t, " ");
        DURATION
            .find(&without_macs)
            .map(|m| normalize_spaces(m.as_str()))
    }) {
        record.online_time = online;
    }
    record.connection_type = connection_type(&texts.join(" ")).to_owned();
    record
}

fn signal(text: &str) -> Option<String> {
    let text = collapse_self_repeat(text);
    SIGNAL_DBM
        .captures(text)
        .or_else(|| SIGNAL_BARE.captures(text))
        .map(|c| c[1].to_owned())
}

fn rate(re: &Regex, text: &str) -> Option<String> {
    let text = collapse_self_repeat(text);
    re.captures(text).map(|c| format!("{}{}", &c[1], &c[2]))
}

fn connection_type(row_text: &str) -> &'static str {
    let lower = row_text.to_lowercase();
    if lower.contains("wifi") {
        "wifi"
    } else if lower.contains("mesh") {
        "mesh"
    } else if ["lan", "ethernet", "wired"].iter().any(|k| lower.contains(k)) {
        "wired"
    } else {
        UNKNOWN
    }
}

/// First non-empty text node of a cell.
fn first_line(cell: ElementRef<'_>) -> Option<String> {
    cell.text()
        .flat_map(str::lines)
        .map(normalize_spaces)
        .find(|l| !l.is_empty())
}

fn desktop_node(cell: ElementRef<'_>) -> ElementRef<'_> {
    cell.select(&DESKTOP).next().unwrap_or(cell)
}

fn desktop_text(cell: ElementRef<'_>) -> String {
    element_text(desktop_node(cell))
}

fn desktop_parts(cell: ElementRef<'_>) -> Vec<String> {
    desktop_node(cell)
        .text()
        .map(normalize_spaces)
        .filter(|t| !t.is_empty())
        .collect()
}
