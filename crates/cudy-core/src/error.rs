// ── Core error types ──
//
// User-facing errors from cudy-core. Consumers never see HTTP status codes
// or page layout details directly; the `From<cudy_api::Error>` impl
// translates them into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to router at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Router not connected")]
    NotConnected,

    #[error("Router request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Router returned no data for any module")]
    EmptySnapshot,

    #[error("Device not found: {mac}")]
    DeviceNotFound { mac: String },

    #[error("Field `{field}` not found on {page}")]
    FieldMissing { page: String, field: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Router refused {operation}")]
    Rejected { operation: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<cudy_api::Error> for CoreError {
    fn from(err: cudy_api::Error) -> Self {
        match err {
            cudy_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            cudy_api::Error::SessionRejected { status } => CoreError::AuthenticationFailed {
                message: format!("session rejected after re-login (HTTP {status})"),
            },
            cudy_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::ConnectionFailed {
                        host: e
                            .url()
                            .and_then(|u| u.host_str().map(str::to_owned))
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            cudy_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid router address: {e}"),
            },
            cudy_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                host: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            cudy_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            cudy_api::Error::FieldMissing { page, field } => {
                CoreError::FieldMissing { page, field }
            }
        }
    }
}
