// Mutating actions
//
// Every change resubmits a full LuCI configuration form and then asks the
// router to restart the affected services. Mutations hold `mutation_lock`
// for their whole duration, service restart wait included.

use indexmap::IndexMap;
use reqwest::Method;
use reqwest::header::LOCATION;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::html::form::{InputField, form_fields, form_inputs, inputs, page_token};
use crate::luci::client::{LuciClient, Payload, RequestOptions};
use crate::model::{VpnState, WifiBand, WifiState};

const REBOOT: &str = "/cgi-bin/luci/admin/system/reboot";
const SETUP_PAGE: &str = "/cgi-bin/luci/admin/setup";
const SERVICE_RESTART: &str = "/cgi-bin/luci/admin/servicectl/restart";
const SERVICE_STATUS: &str = "/cgi-bin/luci/admin/servicectl/status";
const WIRELESS_FORM: &str = "/cgi-bin/luci/admin/network/wireless/config/uncombine?embedded=&nomodal=";
const VPN_FORM: &str = "/cgi-bin/luci/admin/network/vpn/config?nomodal=";
const VPN_PAGE: &str = "/cgi-bin/luci/admin/network/vpn";

const VPN_ENABLED: &str = "cbid.vpn.config.enabled";

/// Cache-busting `_=<ms>` suffix.
fn cache_buster(path: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}_={}", chrono::Utc::now().timestamp_millis())
}

fn unix_now() -> String {
    chrono::Utc::now().timestamp().to_string()
}

fn xhr_from(referer: &str) -> RequestOptions {
    RequestOptions {
        xhr: true,
        referer: Some(referer.to_owned()),
        ..RequestOptions::default()
    }
}

fn into_pairs(fields: IndexMap<String, String>) -> Vec<(String, String)> {
    fields.into_iter().collect()
}

// ── Form rewriting ──────────────────────────────────────────────────

fn disabled_key(iface: &str) -> String {
    format!("cbid.wireless.{iface}.disabled")
}

/// Rewrite a harvested wireless form to set one band.
///
/// The submit saves the whole page, so both `disabled` flags are always sent
/// and the untouched band keeps its current value. Fields of the combined
/// Smart Connect interface `wlan` are dropped so it is not re-enabled.
pub(crate) fn wifi_submission(
    mut fields: IndexMap<String, String>,
    band: WifiBand,
    enabled: bool,
    timeclock: &str,
) -> IndexMap<String, String> {
    fields.retain(|k, _| {
        !k.starts_with("cbid.wireless.wlan.") && !k.starts_with("cbi.cbe.wireless.wlan.")
    });

    let current = |fields: &IndexMap<String, String>, b: WifiBand| {
        fields
            .get(&disabled_key(b.iface()))
            .cloned()
            .unwrap_or_else(|| "0".to_owned())
    };
    let other = match band {
        WifiBand::Band24 => WifiBand::Band5,
        WifiBand::Band5 => WifiBand::Band24,
    };
    let other_value = current(&fields, other);

    for b in [WifiBand::Band24, WifiBand::Band5] {
        fields
            .entry(format!("cbi.cbe.wireless.{}.disabled", b.iface()))
            .or_insert_with(|| "1".to_owned());
    }
    fields.insert(
        disabled_key(band.iface()),
        if enabled { "0" } else { "1" }.to_owned(),
    );
    fields.insert(disabled_key(other.iface()), other_value);

    fields
        .entry("cbi.submit".to_owned())
        .or_insert_with(|| "1".to_owned());
    fields
        .entry("timeclock".to_owned())
        .or_insert_with(|| timeclock.to_owned());
    fields
        .entry("cbi.apply".to_owned())
        .or_insert_with(|| "1".to_owned());
    fields
}

/// Rewrite a harvested VPN form to toggle the server.
pub(crate) fn vpn_submission(
    mut fields: IndexMap<String, String>,
    enabled: bool,
    timeclock: &str,
) -> IndexMap<String, String> {
    fields
        .entry("cbi.submit".to_owned())
        .or_insert_with(|| "1".to_owned());
    fields
        .entry("cbi.apply".to_owned())
        .or_insert_with(|| "1".to_owned());
    fields.insert("cbi.cbe.vpn.config.enabled".to_owned(), "1".to_owned());
    fields.insert(
        VPN_ENABLED.to_owned(),
        if enabled { "1" } else { "0" }.to_owned(),
    );
    // only refreshed when the page carries one
    if let Some(tc) = fields.get_mut("timeclock") {
        *tc = timeclock.to_owned();
    }
    fields
}

// ── State readers ───────────────────────────────────────────────────

fn input_value<'a>(all: &'a [InputField], name: &str) -> Option<&'a str> {
    all.iter()
        .find(|i| i.name == name)
        .and_then(|i| i.value.as_deref())
}

pub(crate) fn wifi_state_from(html: &str) -> Result<WifiState, Error> {
    let all = inputs(html);
    let read = |band: WifiBand| {
        let field = disabled_key(band.iface());
        input_value(&all, &field)
            .map(|v| v == "0")
            .ok_or(Error::FieldMissing {
                page: "wireless config".into(),
                field,
            })
    };
    Ok(WifiState {
        band_24: read(WifiBand::Band24)?,
        band_5: read(WifiBand::Band5)?,
    })
}

/// Enabled flag of the VPN form, `None` when the page has no such field.
pub(crate) fn vpn_enabled_from(html: &str) -> Option<bool> {
    let all = form_inputs(html)?;
    if let Some(v) = input_value(&all, VPN_ENABLED) {
        return Some(v.trim() == "1");
    }
    if let Some(v) = all
        .iter()
        .filter(|i| i.name.contains("vpn.config") && i.name.ends_with(".enabled"))
        .find_map(|i| i.value.as_deref())
    {
        return Some(v.trim() == "1");
    }
    all.iter()
        .find(|i| i.kind == "checkbox")
        .filter(|cb| cb.name.ends_with("enabled"))
        .map(|cb| cb.checked)
}

// ── Actions ─────────────────────────────────────────────────────────

impl LuciClient {
    /// Ask the router to reboot. `Ok(false)` when it refuses.
    pub async fn reboot(&self) -> Result<bool, Error> {
        let _guard = self.mutation_lock.lock().await;
        let resp = self
            .execute(
                Method::POST,
                REBOOT,
                &Payload::Form(vec![("reboot".into(), "1".into())]),
                &RequestOptions::default(),
            )
            .await?;
        let status = resp.status();
        let accepted = status.is_success() || status.is_redirection();
        if accepted {
            info!(host = %self.host(), "reboot requested");
        } else {
            warn!(status = %status, "reboot refused");
        }
        Ok(accepted)
    }

    /// Trigger a service restart without waiting for it.
    async fn servicectl_trigger(&self, services: &str, token: &str) -> Result<bool, Error> {
        let resp = self
            .execute(
                Method::POST,
                &format!("{SERVICE_RESTART}/{services}"),
                &Payload::Form(vec![("token".into(), token.to_owned())]),
                &xhr_from(SETUP_PAGE),
            )
            .await?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            debug!(services, status = %status, "servicectl restart refused");
            return Ok(false);
        }
        Ok(true)
    }

    /// Restart `services` and poll the status endpoint until it reads
    /// `finish` or the restart timeout runs out.
    pub(crate) async fn servicectl_restart(&self, services: &str, token: &str) -> Result<bool, Error> {
        if !self.servicectl_trigger(services, token).await? {
            return Ok(false);
        }

        let deadline = Instant::now() + self.service_restart_timeout;
        while Instant::now() < deadline {
            match self
                .execute(Method::GET, SERVICE_STATUS, &Payload::Empty, &xhr_from(SETUP_PAGE))
                .await
            {
                Ok(resp) => {
                    let status = resp.text().await.unwrap_or_default();
                    if status.trim().eq_ignore_ascii_case("finish") {
                        debug!(services, "service restart finished");
                        return Ok(true);
                    }
                }
                Err(e) => debug!(services, error = %e, "servicectl status poll failed"),
            }
            sleep(self.service_poll_interval).await;
        }

        debug!(services, "servicectl status timeout");
        Ok(false)
    }

    /// XHR GET of a configuration page. Empty when the router refuses.
    async fn config_page(&self, path: &str, referer: &str) -> Result<String, Error> {
        let resp = self
            .execute(Method::GET, &cache_buster(path), &Payload::Empty, &xhr_from(referer))
            .await?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            debug!(path, status = %status, "config page refused");
            return Ok(String::new());
        }
        Ok(resp.text().await?)
    }

    /// Enable or disable one radio, keeping the other as it is.
    ///
    /// `Ok(true)` once the router accepted the form; the service restart
    /// that follows is waited for but does not change the result.
    pub async fn set_wifi(&self, band: WifiBand, enabled: bool) -> Result<bool, Error> {
        let _guard = self.mutation_lock.lock().await;

        let page = self.config_page(WIRELESS_FORM, SETUP_PAGE).await?;
        if page.is_empty() {
            warn!("wireless config page is empty");
            return Ok(false);
        }
        let Some(fields) = form_fields(&page) else {
            warn!("wireless config form not found");
            return Ok(false);
        };
        let Some(token) = fields.get("token").filter(|t| !t.is_empty()).cloned() else {
            warn!("wireless config form has no token");
            return Ok(false);
        };

        let submission = wifi_submission(fields, band, enabled, &unix_now());
        debug!(
            %band,
            enabled,
            wlan00 = submission.get("cbid.wireless.wlan00.disabled").map(String::as_str),
            wlan10 = submission.get("cbid.wireless.wlan10.disabled").map(String::as_str),
            "submitting wireless form"
        );
        let resp = self
            .execute(
                Method::POST,
                WIRELESS_FORM,
                &Payload::Multipart(into_pairs(submission)),
                &xhr_from(SETUP_PAGE),
            )
            .await?;
        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            warn!(status = %status, "wireless form rejected");
            return Ok(false);
        }
        let reply = resp.text().await.unwrap_or_default();

        let restart_token = page_token(&reply)
            .or_else(|| page_token(&page))
            .unwrap_or(token);
        let applied = self.servicectl_restart("wireless,vlan", &restart_token).await?;
        debug!(applied, "servicectl wireless,vlan");
        info!(%band, enabled, "wifi updated");
        Ok(true)
    }

    /// Enabled state of both radios.
    pub async fn get_wifi_state(&self) -> Result<WifiState, Error> {
        let page = self.config_page(WIRELESS_FORM, SETUP_PAGE).await?;
        wifi_state_from(&page)
    }

    /// Enabled state of the WireGuard server.
    pub async fn get_vpn_state(&self) -> Result<VpnState, Error> {
        for path in [VPN_FORM, VPN_PAGE] {
            let page = self.config_page(path, VPN_PAGE).await?;
            if page.is_empty() {
                debug!(path, "empty VPN page");
                continue;
            }
            if let Some(wireguard) = vpn_enabled_from(&page) {
                return Ok(VpnState { wireguard });
            }
            debug!(path, "VPN enabled field not found");
        }
        Err(Error::FieldMissing {
            page: "VPN config".into(),
            field: VPN_ENABLED.into(),
        })
    }

    /// Enable or disable the WireGuard server.
    pub async fn set_vpn(&self, enabled: bool) -> Result<bool, Error> {
        let _guard = self.mutation_lock.lock().await;

        let page = self.config_page(VPN_FORM, SETUP_PAGE).await?;
        if page.is_empty() {
            warn!("VPN config page is empty");
            return Ok(false);
        }
        let Some(fields) = form_fields(&page) else {
            warn!("VPN config form not found");
            return Ok(false);
        };
        let token = fields.get("token").filter(|t| !t.is_empty()).cloned();

        let submission = vpn_submission(fields, enabled, &unix_now());
        let opts = RequestOptions {
            follow_redirects: false,
            ..xhr_from(SETUP_PAGE)
        };
        let resp = self
            .execute(
                Method::POST,
                VPN_FORM,
                &Payload::Multipart(into_pairs(submission)),
                &opts,
            )
            .await?;
        let status = resp.status().as_u16();
        if !matches!(status, 200 | 302 | 303) {
            warn!(status, "VPN form rejected");
            return Ok(false);
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        if let Some(location) = location {
            if let Err(e) = self
                .execute(Method::GET, &location, &Payload::Empty, &xhr_from(SETUP_PAGE))
                .await
            {
                debug!(error = %e, "following VPN redirect failed");
            }
        }

        if let Some(token) = token {
            match self.servicectl_trigger("firewall", &token).await {
                Ok(triggered) => debug!(triggered, "servicectl firewall"),
                Err(e) => debug!(error = %e, "servicectl firewall failed"),
            }
        }
        info!(enabled, "vpn updated");
        Ok(true)
    }
}
