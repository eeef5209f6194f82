use thiserror::Error;

/// Top-level error type for the `cudy-api` crate.
///
/// Extraction misses are never errors here: a label the firmware does not
/// render degrades to a sentinel value. What remains are session, transport
/// and form-level failures. `cudy-core` maps these into user-facing
/// diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// No session cookie could be obtained on either scheme.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The router kept refusing the request after a fresh login.
    #[error("Session rejected by router (HTTP {status}) after re-authentication")]
    SessionRejected { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A configuration form did not contain a field the operation needs.
    #[error("Field `{field}` not found on {page}")]
    FieldMissing { page: String, field: String },
}

impl Error {
    /// Returns `true` if credentials or the session are the problem,
    /// as opposed to the network or the page layout.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::SessionRejected { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
