//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use cudy_config::ConfigError;
use cudy_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to router at {host}")]
    #[diagnostic(
        code(cudy::connection_failed),
        help(
            "Check that the router is reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("Router returned no data")]
    #[diagnostic(
        code(cudy::empty_snapshot),
        help("None of the known status pages answered. Try --model generic or -vv.")
    )]
    EmptySnapshot,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(cudy::auth_failed),
        help(
            "{message}\n\
             Verify the username and password.\n\
             Run: cudy config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(cudy::no_credentials),
        help(
            "Configure one with: cudy config init\n\
             Or set the CUDY_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Device '{mac}' not connected")]
    #[diagnostic(
        code(cudy::not_found),
        help("Run: cudy devices to see connected devices")
    )]
    DeviceNotFound { mac: String },

    #[error("Field `{field}` not found on {page}")]
    #[diagnostic(
        code(cudy::field_missing),
        help("This firmware may not expose the setting.")
    )]
    FieldMissing { page: String, field: String },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Router refused {operation}")]
    #[diagnostic(code(cudy::rejected))]
    Rejected { operation: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(cudy::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(cudy::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: cudy config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No router configured")]
    #[diagnostic(
        code(cudy::no_config),
        help(
            "Create a profile with: cudy config init\n\
             Or pass --host. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(cudy::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(cudy::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(cudy::timeout),
        help("Increase timeout with --timeout or check router responsiveness.")
    )]
    Timeout,

    #[error("{0}")]
    #[diagnostic(code(cudy::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::EmptySnapshot => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } | Self::FieldMissing { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name to authentication failures.
    pub fn for_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => Self::ConnectionFailed { host, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::NotConnected => Self::ConnectionFailed {
                host: "(disconnected)".into(),
                reason: "router connection was closed".into(),
            },
            CoreError::Timeout => Self::Timeout,
            CoreError::EmptySnapshot => Self::EmptySnapshot,
            CoreError::DeviceNotFound { mac } => Self::DeviceNotFound { mac },
            CoreError::FieldMissing { page, field } => Self::FieldMissing { page, field },
            CoreError::Rejected { operation } => Self::Rejected { operation },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            other => Self::Config(other),
        }
    }
}
