//! Clap derive structures for the `cudy` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use cudy_core::{ModelFamily, Module, WifiBand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cudy -- read status from and control Cudy routers
#[derive(Debug, Parser)]
#[command(
    name = "cudy",
    version,
    about = "Read status from and control Cudy routers",
    long_about = "Talks to the LuCI web interface of Cudy routers.\n\n\
        Scrapes the status pages into structured data and drives the\n\
        reboot, Wi-Fi and VPN forms.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Router profile to use
    #[arg(long, short = 'p', env = "CUDY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Router address (overrides profile)
    #[arg(long, short = 'H', env = "CUDY_HOST", global = true)]
    pub host: Option<String>,

    /// Login user
    #[arg(long, short = 'u', env = "CUDY_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "CUDY_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Try https before http
    #[arg(long, global = true)]
    pub https: bool,

    /// Skip model detection
    #[arg(long, short = 'm', env = "CUDY_MODEL", global = true)]
    pub model: Option<ModelFamily>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CUDY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Verify TLS certificates against the system store
    #[arg(long, env = "CUDY_VERIFY_TLS", global = true)]
    pub verify_tls: bool,

    /// Request timeout in seconds
    #[arg(long, env = "CUDY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe every status page and print the result
    #[command(alias = "snap", alias = "s")]
    Snapshot(SnapshotArgs),

    /// List connected client devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Detect the router model
    Detect,

    /// Reboot the router
    Reboot,

    /// Show or toggle the Wi-Fi radios
    #[command(alias = "w")]
    Wifi(WifiArgs),

    /// Show or toggle the VPN service
    Vpn(VpnArgs),

    /// Poll and print the snapshot until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Limit output to one module (e.g. system, wan, wifi_5g)
    #[arg(long)]
    pub module: Option<Module>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: Option<DevicesCommand>,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List all connected devices
    #[command(alias = "ls")]
    List,

    /// Show one device by MAC address
    Get { mac: String },

    /// Exit 0 if the device is connected, 4 otherwise
    Present { mac: String },
}

// ── Wi-Fi / VPN ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WifiArgs {
    #[command(subcommand)]
    pub command: Option<WifiCommand>,
}

#[derive(Debug, Subcommand)]
pub enum WifiCommand {
    /// Show the enabled state of both radios
    Status,

    /// Enable a radio
    On {
        /// Band: 2g or 5g
        #[arg(value_parser = parse_band)]
        band: WifiBand,
    },

    /// Disable a radio
    Off {
        /// Band: 2g or 5g
        #[arg(value_parser = parse_band)]
        band: WifiBand,
    },
}

#[derive(Debug, Args)]
pub struct VpnArgs {
    #[command(subcommand)]
    pub command: Option<VpnCommand>,
}

#[derive(Debug, Subcommand)]
pub enum VpnCommand {
    /// Show whether the VPN is enabled
    Status,
    /// Enable the VPN
    On,
    /// Disable the VPN
    Off,
}

fn parse_band(s: &str) -> Result<WifiBand, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "2g" | "2.4g" | "2.4ghz" | "24g" | "2" => Ok(WifiBand::Band24),
        "5g" | "5ghz" | "5" => Ok(WifiBand::Band5),
        other => Err(format!("unknown band '{other}', expected 2g or 5g")),
    }
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Refresh interval (e.g. 30s, 2m)
    #[arg(long, short = 'i', default_value = "30s", value_parser = humantime::parse_duration)]
    pub interval: Duration,

    /// Print the device list instead of the full snapshot
    #[arg(long)]
    pub devices: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the current configuration
    Show,

    /// Set a profile value
    Set { key: String, value: String },

    /// List profiles (default marked with *)
    Profiles,

    /// Set the default profile
    Use { name: String },

    /// Store the active profile's password in the system keyring
    SetPassword,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
