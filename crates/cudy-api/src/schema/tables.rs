// Sensor and endpoint tables for every module.
//
// Labels are the visible row headings across firmware builds and locales,
// in lookup priority order. Endpoints are relative to the LuCI prefix.

use super::{SensorSpec, ValueKind};
use crate::model::Module;

const fn text(key: &'static str, labels: &'static [&'static str]) -> SensorSpec {
    SensorSpec {
        key,
        labels,
        kind: ValueKind::Text,
    }
}

const fn measure(key: &'static str, labels: &'static [&'static str]) -> SensorSpec {
    SensorSpec {
        key,
        labels,
        kind: ValueKind::Measurement,
    }
}

// ── Sensors ─────────────────────────────────────────────────────────

static INFO: &[SensorSpec] = &[
    text("interface", &["Interface"]),
    text("work_mode", &["Work Mode"]),
];

static SYSTEM: &[SensorSpec] = &[
    text("model", &["Model", "Model Name"]),
    text("firmware_version", &["Firmware Version", "Firmware"]),
    text("hardware", &["Hardware"]),
    text("uptime", &["Uptime", "Connected Time", "System Uptime"]),
    text("local_time", &["Local Time", "Localtime", "Time"]),
];

static LAN: &[SensorSpec] = &[
    text("ip", &["IP Address", "LAN IP Address", "LAN IP"]),
    text("subnet", &["Subnet Mask", "Subnet"]),
    text("mac", &["MAC-Address", "MAC Address", "MAC"]),
];

static WAN: &[SensorSpec] = &[
    text(
        "type",
        &[
            "Protocol",
            "Connection Type",
            "Type",
            "WAN Type",
            "Connection type",
            "Tipo connessione",
            "Tipo di connessione",
        ],
    ),
    text(
        "ip",
        &[
            "IP Address",
            "WAN IP",
            "WAN IP address",
            "WAN IP Address",
            "Public IP",
            "Indirizzo IP WAN",
            "Indirizzo IP",
        ],
    ),
    text(
        "gateway",
        &["Gateway", "Default Gateway", "WAN Gateway", "Gateway WAN"],
    ),
    text(
        "uptime",
        &[
            "Connected Time",
            "Uptime",
            "WAN connected time",
            "WAN Connected Time",
            "Tempo connessione",
            "Tempo connessione WAN",
        ],
    ),
    text(
        "dns",
        &[
            "DNS",
            "DNS Server",
            "DNS Address",
            "DNS Addresses",
            "WAN DNS addresses",
            "WAN DNS Addresses",
            "Indirizzi DNS WAN",
        ],
    ),
    text("public_ip", &["Public IP", "Public IP Address"]),
];

static WAN_SECONDARY: &[SensorSpec] = &[
    text("type", &["Protocol", "Connection Type", "Type"]),
    text("ip", &["IP Address", "WAN IP", "Public IP"]),
    text(
        "gateway",
        &["Gateway", "Default Gateway", "WAN Gateway", "Gateway WAN"],
    ),
    text(
        "uptime",
        &[
            "Connected Time",
            "WAN connected time",
            "Uptime",
            "Tempo connessione",
        ],
    ),
    text(
        "dns",
        &[
            "DNS",
            "DNS Server",
            "DNS Address",
            "DNS Addresses",
            "WAN DNS addresses",
            "Indirizzi DNS WAN",
        ],
    ),
];

static MULTI_WAN: &[SensorSpec] = &[text("mode", &["Mode", "Load Balancing"])];

static MESH: &[SensorSpec] = &[
    text("network", &["Mesh Network", "Mesh", "Device Name"]),
    text("units", &["Mesh Units", "Units"]),
    measure(
        "device_count",
        &["Mesh Devices", "Mesh Devices Connected", "Mesh Node Count"],
    ),
];

static DHCP: &[SensorSpec] = &[
    text("ip_start", &["IP Start", "Start IP", "Start"]),
    text("ip_end", &["IP End", "End IP", "End"]),
    text("dns_primary", &["Preferred DNS", "Primary DNS", "DNS Server"]),
    text("dns_secondary", &["Alternate DNS", "Secondary DNS"]),
    text("gateway", &["Default Gateway", "Gateway"]),
    text("lease_time", &["Leasetime", "Lease Time", "Lease"]),
];

static WIFI: &[SensorSpec] = &[
    text("ssid", &["SSID"]),
    text("bssid", &["BSSID"]),
    text("encryption", &["Encryption"]),
    measure("channel", &["Channel"]),
];

static GSM: &[SensorSpec] = &[
    text(
        "network_type",
        &[
            "Network Type",
            "Network",
            "Mode",
            "Access Technology",
            "Cellular Network",
            "WAN Mode",
            "Connection Type",
            "Type",
        ],
    ),
    text("download", &["Download", "Upload / Download"]),
    text("upload", &["Upload", "Upload / Download"]),
    text("public_ip", &["Public IP Address", "Public IP"]),
    text(
        "ip_address",
        &[
            "IP Address",
            "IP address",
            "IPv4 Address",
            "Address",
            "WAN IP Address",
            "Local IP Address",
        ],
    ),
    text("connected_time", &["Connected Time"]),
    measure("rssi", &["RSSI"]),
    text("imsi", &["IMSI"]),
    text("imei", &["IMEI"]),
    text("iccid", &["ICCID"]),
    text("mode", &["Mode"]),
    text("mcc", &["MCC"]),
    text("mnc", &["MNC"]),
    text("cell_id", &["Cell ID"]),
    text("pcid", &["PCID"]),
    text("band", &["Band"]),
    text("ul_bandwidth", &["UL Bandwidth"]),
    text("dl_bandwidth", &["DL Bandwidth"]),
    measure("rsrp", &["RSRP"]),
    measure("rsrq", &["RSRQ"]),
    measure("sinr", &["SINR"]),
    text("pcc", &["PCC"]),
    text("scc_1", &["SCC"]),
    text("scc_2", &["SCC (2)"]),
    text("scc_3", &["SCC (3)"]),
];

static SMS: &[SensorSpec] = &[measure("inbox", &["Inbox"]), measure("outbox", &["Outbox"])];

static VPN: &[SensorSpec] = &[
    text("enabled", &["Status", "Enabled", "VPN Status"]),
    text("tunnels", &["Tunnels", "Tunnel", "VPN Tunnels"]),
];

static USB: &[SensorSpec] = &[
    text("tethering", &["USB Tethering", "Tethering"]),
    text("sharing", &["USB Sharing", "Sharing", "File Sharing"]),
];

static DEVICES: &[SensorSpec] = &[
    measure("device_count", &["Devices"]),
    measure(
        "online",
        &[
            "Online",
            "Online Devices",
            "Online devices",
            "Connected",
            "Devices Online",
            "Dispositivi online",
            "Dispositivi connessi",
            "Connessi",
        ],
    ),
    measure(
        "blocked",
        &[
            "Blocked",
            "Blocked Devices",
            "Blocked devices",
            "Dispositivi bloccati",
            "Bloccati",
        ],
    ),
    measure(
        "wifi_24",
        &[
            "2.4G WiFi",
            "2.4 GHz Wi-Fi devices connected",
            "2.4 GHz WiFi devices connected",
            "2.4 GHz Wi-Fi",
            "WiFi 2.4G",
        ],
    ),
    measure(
        "wifi_5",
        &[
            "5G WiFi",
            "5 GHz Wi-Fi devices connected",
            "5 GHz WiFi devices connected",
            "5 GHz Wi-Fi",
            "WiFi 5G",
        ],
    ),
    measure("wired", &["Wired"]),
    measure("mesh", &["Mesh"]),
];

/// The sensor schema of `module`. The device list has none.
pub fn sensors(module: Module) -> &'static [SensorSpec] {
    match module {
        Module::Info => INFO,
        Module::System => SYSTEM,
        Module::Lan => LAN,
        Module::Wan => WAN,
        Module::WanSecondary => WAN_SECONDARY,
        Module::MultiWan => MULTI_WAN,
        Module::Mesh => MESH,
        Module::Dhcp => DHCP,
        Module::Wifi24g | Module::Wifi5g | Module::Wifi6g => WIFI,
        Module::Gsm => GSM,
        Module::Sms => SMS,
        Module::Vpn => VPN,
        Module::Usb => USB,
        Module::Devices => DEVICES,
        Module::DeviceList => &[],
    }
}

// ── Endpoints ───────────────────────────────────────────────────────

/// Candidate status pages of `module`, relative to `/cgi-bin/luci`, in
/// the order they are tried.
pub fn endpoints(module: Module) -> &'static [&'static str] {
    match module {
        Module::Info => &["/admin/system/wizard"],
        Module::System => &[
            "/admin/system/status?detail=1",
            "/admin/system/status/detail/1",
        ],
        Module::Lan => &["/admin/network/lan/status?detail=1"],
        Module::Wan => &[
            "/admin/network/wan/iface/wan/status?detail=1",
            "/admin/network/wan/status?detail=1",
        ],
        Module::WanSecondary => &["/admin/network/wan/iface/wand/status?detail=1"],
        Module::MultiWan => &["/admin/network/mwan3/status?detail=1"],
        Module::Mesh => &["/admin/network/mesh/status?detail=1"],
        Module::Dhcp => &[
            "/admin/services/dhcp/status?detail=1",
            "/admin/services/dhcp/status",
        ],
        Module::Wifi24g => &["/admin/network/wireless/status?detail=1&iface=wlan00"],
        Module::Wifi5g => &["/admin/network/wireless/status?detail=1&iface=wlan10"],
        Module::Wifi6g => &["/admin/network/wireless/status?detail=1&iface=wlan20"],
        Module::Gsm => &[
            "/admin/network/gcom/status?detail=1&iface=4g",
            "/admin/network/gcom/iface/4g/status?detail=1",
            "/admin/network/gcom/status",
            "/admin/network/gcom?iface=4g",
            "/admin/network/gcom/iface/4g",
            "/admin/network/gcom",
        ],
        Module::Sms => &[
            "/admin/network/gcom/sms/iface/4g/status?detail=1",
            "/admin/network/gcom/sms/status",
        ],
        Module::Vpn => &[
            "/admin/network/vpn/status?detail=1",
            "/admin/network/vpn/config?nomodal=",
            "/admin/network/vpn?nomodal=",
            "/admin/network/vpn",
            "/admin/network/vpn/wireguards?embedded=&nomodal=",
        ],
        Module::Usb => &["/admin/services/usb/status?detail=1"],
        Module::Devices => &["/admin/network/devices/status?detail=1"],
        Module::DeviceList => &["/admin/network/devices/devlist?detail=1"],
    }
}
