// ── Runtime connection configuration ──
//
// These types describe *how* to reach one router. They carry credentials
// and tuning, but never touch disk. The CLI builds a `RouterConfig` and
// hands it in.

use std::path::PathBuf;
use std::time::Duration;

use cudy_api::{ClientConfig, ModelFamily, TlsMode, TransportConfig};
use secrecy::SecretString;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Routers ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one router.
///
/// Built by the CLI, passed to `Router` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Host or `host:port`; a `http://`/`https://` prefix sets the scheme.
    pub host: String,
    /// Try https first when logging in.
    pub use_https: bool,
    pub username: String,
    pub password: SecretString,
    /// Skip model detection and use this family.
    pub model: Option<ModelFamily>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Interval of the background snapshot refresh. Zero disables it.
    pub poll_interval: Duration,
    /// How long a service restart may take after a Wi-Fi or VPN change.
    pub service_restart_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            host: "192.168.10.1".into(),
            use_https: false,
            username: "admin".into(),
            password: SecretString::from(String::new()),
            model: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
            service_restart_timeout: Duration::from_secs(35),
        }
    }
}

impl RouterConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar()
    }

    pub(crate) fn client(&self) -> ClientConfig {
        let mut client = ClientConfig::new(
            self.host.clone(),
            self.username.clone(),
            self.password.clone(),
        );
        client.use_https = self.use_https;
        client.service_restart_timeout = self.service_restart_timeout;
        client
    }
}
