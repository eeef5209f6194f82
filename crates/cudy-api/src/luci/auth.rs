// LuCI form login
//
// GET the login page for its hidden tokens, POST the credentials without
// following the redirect, and take the `sysauth` cookie from `Set-Cookie`
// or, failing that, from the shared jar.

use reqwest::cookie::CookieStore;
use reqwest::header::{ACCEPT, ORIGIN, REFERER, SET_COOKIE};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::html::form::hidden_value;
use crate::luci::client::{
    ACCEPT_HTML, AuthSession, LUCI_PREFIX, LuciClient, Scheme, SessionState,
};

const SESSION_COOKIES: &[&str] = &["sysauth", "sysauth_http", "sysauth_https"];

/// Hidden fields of a login page. Missing ones are empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct LoginTokens {
    pub csrf: String,
    pub token: String,
    pub salt: String,
}

impl LoginTokens {
    pub fn from_page(html: &str) -> Self {
        let field = |name: &str| hidden_value(html, name).unwrap_or_default();
        Self {
            csrf: field("_csrf"),
            token: field("token"),
            salt: field("salt"),
        }
    }
}

fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Password as the login form expects it.
///
/// Salted firmwares want `sha256(password + salt)`, chained with
/// `sha256(.. + token)` when a token is present too.
pub(crate) fn login_password(password: &str, tokens: &LoginTokens) -> String {
    if tokens.salt.is_empty() {
        return password.to_owned();
    }
    let hashed = sha256_hex(&format!("{password}{}", tokens.salt));
    if tokens.token.is_empty() {
        hashed
    } else {
        sha256_hex(&format!("{hashed}{}", tokens.token))
    }
}

/// Login form fields in submission order, empty ones dropped.
pub(crate) fn login_form(
    username: &str,
    password: &str,
    tokens: &LoginTokens,
    timeclock: i64,
) -> Vec<(String, String)> {
    let hashed = login_password(password, tokens);
    let timeclock = timeclock.to_string();
    [
        ("_csrf", tokens.csrf.as_str()),
        ("token", tokens.token.as_str()),
        ("salt", tokens.salt.as_str()),
        ("zonename", "UTC"),
        ("timeclock", timeclock.as_str()),
        ("luci_language", "en"),
        ("luci_username", username),
        ("luci_password", hashed.as_str()),
        ("submit", "1"),
    ]
    .into_iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

/// First session cookie among the `Set-Cookie` values, by header order.
pub(crate) fn session_from_set_cookie<'a>(
    headers: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    for header in headers {
        let Some((name, value)) = header
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
        else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim().trim_matches('"'));
        if SESSION_COOKIES.contains(&name) && !value.is_empty() {
            return Some(value.to_owned());
        }
    }
    None
}

/// Session cookie from a jar `Cookie` header value, by `SESSION_COOKIES`
/// priority.
fn session_from_cookie_header(header: &str) -> Option<String> {
    let pairs: Vec<(&str, &str)> = header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
        .collect();
    SESSION_COOKIES.iter().find_map(|wanted| {
        pairs
            .iter()
            .find(|(name, value)| name == wanted && !value.is_empty())
            .map(|(_, value)| (*value).to_owned())
    })
}

impl LuciClient {
    /// Log in from scratch, trying the preferred scheme then the other one.
    ///
    /// Returns `false` when neither scheme yields a session cookie. Transport
    /// failures are logged, never raised.
    pub async fn authenticate(&self) -> bool {
        let _guard = self.auth_lock.lock().await;
        self.login_locked().await
    }

    /// Login body. Callers hold `auth_lock`.
    pub(crate) async fn login_locked(&self) -> bool {
        *self.state.write().await = SessionState::Authenticating;

        for scheme in self.scheme_order() {
            match self.login_on(scheme).await {
                Ok(Some(cookie)) => {
                    info!(host = %self.host(), %scheme, "logged in");
                    *self.state.write().await =
                        SessionState::Authenticated(AuthSession { cookie, scheme });
                    return true;
                }
                Ok(None) => debug!(%scheme, "login returned no session cookie"),
                Err(e) => debug!(%scheme, error = %e, "login attempt failed"),
            }
        }

        *self.state.write().await = SessionState::Unauthenticated;
        warn!(host = %self.host(), "authentication failed: no sysauth cookie obtained");
        false
    }

    async fn login_on(&self, scheme: Scheme) -> Result<Option<String>, Error> {
        let base = self.base_url(scheme)?;
        let login_url = base.join(LUCI_PREFIX)?;
        debug!("logging in at {}", login_url);

        let page = self
            .http
            .get(login_url.clone())
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await?
            .text()
            .await?;
        if page.is_empty() {
            debug!(%scheme, "empty login page");
            return Ok(None);
        }

        let tokens = LoginTokens::from_page(&page);
        let form = login_form(
            &self.username,
            self.password.expose_secret(),
            &tokens,
            chrono::Utc::now().timestamp(),
        );

        let resp = self
            .http_no_redirect
            .post(login_url.clone())
            .header(ACCEPT, ACCEPT_HTML)
            .header(REFERER, login_url.as_str())
            .header(ORIGIN, base.origin().ascii_serialization())
            .form(&form)
            .send()
            .await?;

        let from_headers = session_from_set_cookie(
            resp.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        Ok(from_headers.or_else(|| self.session_from_jar(&login_url)))
    }

    fn session_from_jar(&self, url: &Url) -> Option<String> {
        let header = self.jar.as_ref()?.cookies(url)?;
        session_from_cookie_header(header.to_str().ok()?)
    }
}
