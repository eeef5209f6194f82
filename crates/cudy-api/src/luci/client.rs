// LuCI HTTP client
//
// Wraps two `reqwest::Client`s (redirect-following and raw) over one cookie
// jar, owns the `sysauth` session and funnels every request through a single
// authenticated path with one re-login on 403. Login lives in `auth.rs`,
// mutations in `actions.rs`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::Deserialize;
use strum::Display;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Path prefix of every LuCI page.
pub const LUCI_PREFIX: &str = "/cgi-bin/luci";

pub(crate) const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Prefix a module-relative path with [`LUCI_PREFIX`].
pub fn luci_path(path: &str) -> String {
    if path.starts_with(LUCI_PREFIX) {
        path.to_owned()
    } else if path.starts_with('/') {
        format!("{LUCI_PREFIX}{path}")
    } else {
        format!("{LUCI_PREFIX}/{path}")
    }
}

// ── Session types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn other(self) -> Self {
        match self {
            Self::Http => Self::Https,
            Self::Https => Self::Http,
        }
    }
}

/// A live `sysauth` session and the scheme it was issued on.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub(crate) cookie: String,
    pub(crate) scheme: Scheme,
}

impl AuthSession {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("cookie", &"[redacted]")
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Observable login state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Default)]
pub(crate) enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(AuthSession),
}

// ── Request plumbing ────────────────────────────────────────────────

/// Response body, sniffed by content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Text(String),
}

impl Body {
    /// The body as text. JSON is re-serialized.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Json(v) => v.to_string(),
        }
    }
}

/// Request payload. Kept as pairs so a retry can rebuild it.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    Form(Vec<(String, String)>),
    Multipart(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub(crate) struct RequestOptions {
    pub follow_redirects: bool,
    pub xhr: bool,
    /// LuCI path sent as `Referer` (with a matching `Origin`).
    pub referer: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            xhr: false,
            referer: None,
        }
    }
}

/// Connection settings of one router.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host`, `host:port`, or a URL whose scheme sets the preferred scheme.
    pub host: String,
    pub use_https: bool,
    pub username: String,
    pub password: SecretString,
    /// Upper bound for a service restart to report completion.
    pub service_restart_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            use_https: false,
            username: username.into(),
            password,
            service_restart_timeout: Duration::from_secs(35),
        }
    }
}

/// Split an optional `scheme://` prefix and any path off a host string.
fn split_host(raw: &str) -> (Option<Scheme>, String) {
    let raw = raw.trim();
    let (scheme, rest) = if let Some(rest) = raw.strip_prefix("https://") {
        (Some(Scheme::Https), rest)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        (Some(Scheme::Http), rest)
    } else {
        (None, raw)
    };
    let host = rest.split('/').next().unwrap_or_default();
    (scheme, host.to_owned())
}

// ── Client ──────────────────────────────────────────────────────────

/// Async client for one router's LuCI web interface.
///
/// Requests are serialized by the caller; the session itself is safe to
/// share, and mutations take an internal lock so two of them never overlap.
pub struct LuciClient {
    pub(crate) http: reqwest::Client,
    pub(crate) http_no_redirect: reqwest::Client,
    pub(crate) jar: Option<Arc<Jar>>,
    host: String,
    preferred: Scheme,
    pub(crate) username: String,
    pub(crate) password: SecretString,
    pub(crate) state: RwLock<SessionState>,
    pub(crate) auth_lock: Mutex<()>,
    pub(crate) mutation_lock: Mutex<()>,
    pub(crate) service_restart_timeout: Duration,
    pub(crate) service_poll_interval: Duration,
}

impl LuciClient {
    /// Create a client from connection settings and a `TransportConfig`.
    ///
    /// A cookie jar is added when the transport has none; the login
    /// fallback reads it when `Set-Cookie` carries no session.
    pub fn new(config: ClientConfig, transport: &TransportConfig) -> Result<Self, Error> {
        let transport = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = transport.build_client()?;
        let http_no_redirect = transport.build_no_redirect_client()?;

        let (scheme, host) = split_host(&config.host);
        if host.is_empty() {
            return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
        }
        let preferred = scheme.unwrap_or(if config.use_https {
            Scheme::Https
        } else {
            Scheme::Http
        });
        // reject hosts that cannot form a URL up front
        Url::parse(&format!("{preferred}://{host}"))?;

        Ok(Self {
            http,
            http_no_redirect,
            jar: transport.cookie_jar,
            host,
            preferred,
            username: config.username,
            password: config.password,
            state: RwLock::new(SessionState::Unauthenticated),
            auth_lock: Mutex::new(()),
            mutation_lock: Mutex::new(()),
            service_restart_timeout: config.service_restart_timeout,
            service_poll_interval: Duration::from_secs(1),
        })
    }

    /// Shorten the service restart poll period (tests, slow links).
    pub fn with_service_poll_interval(mut self, interval: Duration) -> Self {
        self.service_poll_interval = interval;
        self
    }

    /// Router host (with port, without scheme).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Scheme tried first on login.
    pub fn preferred_scheme(&self) -> Scheme {
        self.preferred
    }

    pub async fn auth_state(&self) -> AuthState {
        match &*self.state.read().await {
            SessionState::Unauthenticated => AuthState::Unauthenticated,
            SessionState::Authenticating => AuthState::Authenticating,
            SessionState::Authenticated(_) => AuthState::Authenticated,
        }
    }

    /// The current session, if logged in.
    pub async fn session(&self) -> Option<AuthSession> {
        match &*self.state.read().await {
            SessionState::Authenticated(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Forget the session. LuCI sessions expire server-side; no request is sent.
    pub async fn logout(&self) {
        *self.state.write().await = SessionState::Unauthenticated;
        debug!(host = %self.host, "session dropped");
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn base_url(&self, scheme: Scheme) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{scheme}://{}", self.host))?)
    }

    /// Schemes in login order.
    pub(crate) fn scheme_order(&self) -> [Scheme; 2] {
        [self.preferred, self.preferred.other()]
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated request returning the decoded body.
    ///
    /// Non-2xx responses other than an unrecoverable 403 read as an empty
    /// text body.
    pub async fn request(&self, method: Method, path: &str, payload: Payload) -> Result<Body, Error> {
        let resp = self
            .execute(method, path, &payload, &RequestOptions::default())
            .await?;
        read_body(resp).await
    }

    /// Authenticated GET returning the body as text.
    pub async fn get_text(&self, path: &str) -> Result<String, Error> {
        Ok(self
            .request(Method::GET, path, Payload::Empty)
            .await?
            .into_text())
    }

    /// Send with the session cookie; on 403 log in again and retry once.
    pub(crate) async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
        opts: &RequestOptions,
    ) -> Result<reqwest::Response, Error> {
        let session = self.ensure_session().await?;
        let resp = self
            .send(&session, method.clone(), path, payload, opts)
            .await?;
        if resp.status() != StatusCode::FORBIDDEN {
            return Ok(resp);
        }

        debug!(path, "HTTP 403, re-authenticating");
        self.invalidate(&session).await;
        let session = self.ensure_session().await?;
        let resp = self.send(&session, method, path, payload, opts).await?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::SessionRejected {
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn send(
        &self,
        session: &AuthSession,
        method: Method,
        path: &str,
        payload: &Payload,
        opts: &RequestOptions,
    ) -> Result<reqwest::Response, Error> {
        let base = self.base_url(session.scheme)?;
        let url = base.join(path)?;
        debug!("{} {}", method, url);

        let http = if opts.follow_redirects {
            &self.http
        } else {
            &self.http_no_redirect
        };
        let mut req = http
            .request(method, url)
            .header(ACCEPT, ACCEPT_HTML)
            .header(COOKIE, format!("sysauth={}", session.cookie));
        if opts.xhr {
            req = req.header("X-Requested-With", "XMLHttpRequest");
        }
        if let Some(ref referer) = opts.referer {
            req = req
                .header(REFERER, base.join(referer)?.as_str())
                .header(ORIGIN, base.origin().ascii_serialization());
        }
        req = match payload {
            Payload::Empty => req,
            Payload::Form(pairs) => req.form(pairs),
            Payload::Multipart(pairs) => req.multipart(multipart_form(pairs)),
        };

        req.send().await.map_err(Error::Transport)
    }

    /// The current session, logging in first when there is none.
    pub(crate) async fn ensure_session(&self) -> Result<AuthSession, Error> {
        if let Some(session) = self.session().await {
            return Ok(session);
        }
        let _guard = self.auth_lock.lock().await;
        // another caller may have logged in while we waited
        if let Some(session) = self.session().await {
            return Ok(session);
        }
        if self.login_locked().await {
            if let Some(session) = self.session().await {
                return Ok(session);
            }
        }
        Err(Error::Authentication {
            message: format!("no session cookie from {} over http or https", self.host),
        })
    }

    /// Drop `stale` unless someone already replaced it.
    async fn invalidate(&self, stale: &AuthSession) {
        let mut state = self.state.write().await;
        if matches!(&*state, SessionState::Authenticated(s) if s == stale) {
            *state = SessionState::Unauthenticated;
        }
    }
}

fn multipart_form(pairs: &[(String, String)]) -> reqwest::multipart::Form {
    pairs
        .iter()
        .fold(reqwest::multipart::Form::new(), |form, (k, v)| {
            form.text(k.clone(), v.clone())
        })
}

pub(crate) async fn read_body(resp: reqwest::Response) -> Result<Body, Error> {
    let status = resp.status();
    if !status.is_success() {
        debug!(status = %status, url = %resp.url(), "non-success response read as empty");
        return Ok(Body::Text(String::new()));
    }
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let text = resp.text().await.map_err(Error::Transport)?;
    if is_json {
        serde_json::from_str(&text)
            .map(Body::Json)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text,
            })
    } else {
        Ok(Body::Text(text))
    }
}
