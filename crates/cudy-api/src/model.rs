// Structured telemetry produced by one probe cycle.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Sentinel for text values the page did not render.
pub const UNKNOWN: &str = "n/a";

/// Logical grouping of router status, one status page (or several
/// alternate spellings of it) per module.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Module {
    Info,
    System,
    Lan,
    Wan,
    WanSecondary,
    MultiWan,
    Mesh,
    Dhcp,
    #[serde(rename = "wifi_24g")]
    #[strum(serialize = "wifi_24g")]
    Wifi24g,
    #[serde(rename = "wifi_5g")]
    #[strum(serialize = "wifi_5g")]
    Wifi5g,
    #[serde(rename = "wifi_6g")]
    #[strum(serialize = "wifi_6g")]
    Wifi6g,
    Gsm,
    Sms,
    Vpn,
    Usb,
    Devices,
    DeviceList,
}

impl Module {
    /// Whether this module yields a device list rather than a record.
    pub fn is_device_list(self) -> bool {
        matches!(self, Self::DeviceList)
    }
}

// ── Sensor values ───────────────────────────────────────────────────

/// A resolved sensor value.
///
/// Text that could not be found is the literal [`UNKNOWN`]; measurements
/// that could not be found are `Integer(None)` (serialized as `null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Integer(Option<i64>),
    Text(String),
}

impl SensorValue {
    pub fn unknown_text() -> Self {
        Self::Text(UNKNOWN.to_owned())
    }

    /// `true` for `"n/a"` and `Integer(None)`.
    pub fn is_unknown(&self) -> bool {
        match self {
            Self::Integer(v) => v.is_none(),
            Self::Text(s) => s == UNKNOWN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Integer(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => *v,
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(Some(n)) => write!(f, "{n}"),
            Self::Integer(None) => f.write_str(UNKNOWN),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Output key → value for one module, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleRecord(IndexMap<String, SensorValue>);

impl ModuleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SensorValue> {
        self.0.get(key)
    }

    /// Text value of `key`, `None` when absent or unknown.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)
            .filter(|v| !v.is_unknown())
            .and_then(SensorValue::as_text)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: SensorValue) {
        self.0.insert(key.into(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SensorValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when at least one value was actually resolved.
    pub fn has_data(&self) -> bool {
        self.0.values().any(|v| !v.is_unknown())
    }

    /// Overlay `other` onto `self`: known values in `other` replace ours,
    /// unknown values never clobber a known one.
    pub fn merge(&mut self, other: Self) {
        for (key, value) in other.0 {
            match self.0.get(&key) {
                Some(existing) if value.is_unknown() && !existing.is_unknown() => {}
                _ => {
                    self.0.insert(key, value);
                }
            }
        }
    }
}

// ── Devices ─────────────────────────────────────────────────────────

/// One client device from the connected-devices table.
///
/// Every field is present; unresolved ones hold [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub hostname: String,
    pub ip: String,
    pub mac: String,
    pub upload_speed: String,
    pub download_speed: String,
    pub signal: String,
    pub online_time: String,
    pub connection_type: String,
    /// Internet access toggle, only rendered by newer firmware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internet_access: Option<bool>,
}

impl Default for DeviceRecord {
    fn default() -> Self {
        let unknown = || UNKNOWN.to_owned();
        Self {
            hostname: unknown(),
            ip: unknown(),
            mac: unknown(),
            upload_speed: unknown(),
            download_speed: unknown(),
            signal: unknown(),
            online_time: unknown(),
            connection_type: unknown(),
            internet_access: None,
        }
    }
}

impl DeviceRecord {
    pub fn is_wired(&self) -> bool {
        self.connection_type == "wired"
    }

    /// Whether the router reports a live radio link for this client.
    pub fn has_signal(&self) -> bool {
        let s = self.signal.trim();
        !(s.is_empty() || s == UNKNOWN || s == "---")
    }

    pub fn has_mac(&self) -> bool {
        self.mac != UNKNOWN
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Parsed content of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleData {
    Record(ModuleRecord),
    Devices(Vec<DeviceRecord>),
}

impl ModuleData {
    pub fn as_record(&self) -> Option<&ModuleRecord> {
        match self {
            Self::Record(r) => Some(r),
            Self::Devices(_) => None,
        }
    }

    pub fn as_devices(&self) -> Option<&[DeviceRecord]> {
        match self {
            Self::Devices(d) => Some(d),
            Self::Record(_) => None,
        }
    }
}

/// Everything one probe cycle found. Modules the router does not expose
/// are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(IndexMap<Module, ModuleData>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module, data: ModuleData) {
        self.0.insert(module, data);
    }

    pub fn get(&self, module: Module) -> Option<&ModuleData> {
        self.0.get(&module)
    }

    pub fn record(&self, module: Module) -> Option<&ModuleRecord> {
        self.get(module).and_then(ModuleData::as_record)
    }

    pub fn record_mut(&mut self, module: Module) -> Option<&mut ModuleRecord> {
        match self.0.get_mut(&module) {
            Some(ModuleData::Record(r)) => Some(r),
            _ => None,
        }
    }

    /// The device list, empty when the module was not found.
    pub fn devices(&self) -> &[DeviceRecord] {
        self.get(Module::DeviceList)
            .and_then(ModuleData::as_devices)
            .unwrap_or_default()
    }

    pub fn modules(&self) -> impl Iterator<Item = Module> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Module, &ModuleData)> {
        self.0.iter().map(|(m, d)| (*m, d))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Actions ─────────────────────────────────────────────────────────

/// Radio band addressed by Wi-Fi toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum WifiBand {
    #[serde(rename = "2g")]
    #[strum(serialize = "2g")]
    Band24,
    #[serde(rename = "5g")]
    #[strum(serialize = "5g")]
    Band5,
}

impl WifiBand {
    /// Parse the loose spellings users type. Anything unrecognized is 2.4 GHz.
    pub fn from_alias(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "5g" | "5ghz" | "5" => Self::Band5,
            _ => Self::Band24,
        }
    }

    /// UCI section of the radio interface.
    pub fn iface(self) -> &'static str {
        match self {
            Self::Band24 => "wlan00",
            Self::Band5 => "wlan10",
        }
    }
}

/// Enabled state of each radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiState {
    #[serde(rename = "2g")]
    pub band_24: bool,
    #[serde(rename = "5g")]
    pub band_5: bool,
}

impl WifiState {
    pub fn get(self, band: WifiBand) -> bool {
        match band {
            WifiBand::Band24 => self.band_24,
            WifiBand::Band5 => self.band_5,
        }
    }
}

/// Enabled state of the VPN service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnState {
    pub wireguard: bool,
}
