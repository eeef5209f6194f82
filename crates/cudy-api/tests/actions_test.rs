#![allow(clippy::unwrap_used)]
// Integration tests for the mutating actions using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cudy_api::{ClientConfig, Error, LuciClient, TransportConfig, VpnState, WifiBand, WifiState};

// ── Helpers ─────────────────────────────────────────────────────────

const WIRELESS: &str = "/cgi-bin/luci/admin/network/wireless/config/uncombine";
const VPN_CONFIG: &str = "/cgi-bin/luci/admin/network/vpn/config";

const WIRELESS_FORM: &str = r#"<form name="cbi" method="post" enctype="multipart/form-data">
    <input type="hidden" name="token" value="0123456789abcdef0123456789abcdef">
    <input type="hidden" name="cbi.cbe.wireless.wlan00.disabled" value="1">
    <input type="hidden" name="cbid.wireless.wlan00.disabled" value="0">
    <input type="hidden" name="cbid.wireless.wlan10.disabled" value="1">
    <input type="text" name="cbid.wireless.wlan00.ssid" value="home">
    <input type="text" name="cbid.wireless.wlan.ssid" value="smart">
    <input type="submit" name="cbi.save" value="Save">
    </form>"#;

const VPN_FORM: &str = r#"<form name="cbi" method="post">
    <input type="hidden" name="token" value="fedcba9876543210fedcba9876543210">
    <input type="hidden" name="timeclock" value="1">
    <input type="hidden" name="cbid.vpn.config.enabled" value="1">
    <input type="text" name="cbid.vpn.config.port" value="51820">
    </form>"#;

/// Multipart fragment of a text field.
fn part(name: &str, value: &str) -> String {
    format!("name=\"{name}\"\r\n\r\n{value}\r\n")
}

async fn setup() -> (MockServer, LuciClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Set-Cookie", "sysauth=abc123; path=/"),
        )
        .mount(&server)
        .await;

    let password: SecretString = "secret".to_string().into();
    let mut config = ClientConfig::new(server.uri(), "admin", password);
    config.service_restart_timeout = Duration::from_millis(200);
    let transport = TransportConfig {
        timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    };
    let client = LuciClient::new(config, &transport)
        .unwrap()
        .with_service_poll_interval(Duration::from_millis(20));
    (server, client)
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci/admin/servicectl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1..)
        .mount(server)
        .await;
}

// ── Reboot ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reboot_posts_the_trigger() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/system/reboot"))
        .and(body_string_contains("reboot=1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.reboot().await.unwrap());
}

// ── Wi-Fi ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_wifi_state_from_uncombine_form() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(WIRELESS))
        .and(query_param("embedded", ""))
        .and(query_param("nomodal", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string(WIRELESS_FORM))
        .mount(&server)
        .await;

    assert_eq!(
        client.get_wifi_state().await.unwrap(),
        WifiState {
            band_24: true,
            band_5: false,
        }
    );
}

#[tokio::test]
async fn test_wifi_state_without_fields_is_an_error() {
    let (server, client) = setup().await;
    mount_page(&server, WIRELESS, "<form name='cbi'></form>").await;

    let result = client.get_wifi_state().await;
    assert!(
        matches!(result, Err(Error::FieldMissing { .. })),
        "expected FieldMissing, got: {result:?}"
    );
}

#[tokio::test]
async fn test_set_wifi_submits_both_bands_and_restarts() {
    let (server, client) = setup().await;
    mount_page(&server, WIRELESS, WIRELESS_FORM).await;
    Mock::given(method("POST"))
        .and(path(WIRELESS))
        .and(body_string_contains(part("cbid.wireless.wlan10.disabled", "0").as_str()))
        .and(body_string_contains(part("cbid.wireless.wlan00.disabled", "0").as_str()))
        .and(body_string_contains(part("cbi.cbe.wireless.wlan10.disabled", "1").as_str()))
        .and(body_string_contains(part("cbi.apply", "1").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>saved</p>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/servicectl/restart/wireless,vlan"))
        .and(body_string_contains("token=0123456789abcdef0123456789abcdef"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_status(&server, " FINISH\n").await;

    assert!(client.set_wifi(WifiBand::Band5, true).await.unwrap());

    let requests = server.received_requests().await.unwrap();
    let submit = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == WIRELESS)
        .unwrap();
    let body = String::from_utf8_lossy(&submit.body);
    assert!(!body.contains("cbid.wireless.wlan.ssid"));
    assert!(!body.contains("cbi.save"));
}

#[tokio::test]
async fn test_set_wifi_survives_restart_timeout() {
    let (server, client) = setup().await;
    mount_page(&server, WIRELESS, WIRELESS_FORM).await;
    Mock::given(method("POST"))
        .and(path(WIRELESS))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/servicectl/restart/wireless,vlan"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_status(&server, "running").await;

    assert!(client.set_wifi(WifiBand::Band24, false).await.unwrap());
}

#[tokio::test]
async fn test_set_wifi_without_token_is_refused() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        WIRELESS,
        r#"<form name="cbi"><input name="cbid.wireless.wlan00.disabled" value="0"></form>"#,
    )
    .await;
    Mock::given(method("POST"))
        .and(path(WIRELESS))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!client.set_wifi(WifiBand::Band24, true).await.unwrap());
}

#[tokio::test]
async fn test_set_wifi_rejected_form() {
    let (server, client) = setup().await;
    mount_page(&server, WIRELESS, WIRELESS_FORM).await;
    Mock::given(method("POST"))
        .and(path(WIRELESS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(!client.set_wifi(WifiBand::Band24, true).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_wifi_changes_do_not_interleave() {
    let (server, client) = setup().await;
    mount_page(&server, WIRELESS, WIRELESS_FORM).await;
    Mock::given(method("POST"))
        .and(path(WIRELESS))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(150)))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/servicectl/restart/wireless,vlan"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_status(&server, "finish").await;

    let (first, second) = tokio::join!(
        client.set_wifi(WifiBand::Band24, false),
        client.set_wifi(WifiBand::Band5, true),
    );
    assert!(first.unwrap());
    assert!(second.unwrap());

    let wireless: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == WIRELESS)
        .map(|r| r.method.to_string())
        .collect();
    assert_eq!(wireless, vec!["GET", "POST", "GET", "POST"]);
}

// ── VPN ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_vpn_state_from_config_page() {
    let (server, client) = setup().await;
    mount_page(&server, VPN_CONFIG, VPN_FORM).await;

    assert_eq!(
        client.get_vpn_state().await.unwrap(),
        VpnState { wireguard: true }
    );
}

#[tokio::test]
async fn test_vpn_state_falls_back_to_vpn_page() {
    let (server, client) = setup().await;
    mount_page(&server, VPN_CONFIG, "").await;
    mount_page(
        &server,
        "/cgi-bin/luci/admin/network/vpn",
        r#"<form><input type="checkbox" name="cbid.wg.enabled"></form>"#,
    )
    .await;

    assert_eq!(
        client.get_vpn_state().await.unwrap(),
        VpnState { wireguard: false }
    );
}

#[tokio::test]
async fn test_vpn_state_missing_everywhere() {
    let (server, client) = setup().await;
    mount_page(&server, VPN_CONFIG, "<form></form>").await;
    mount_page(&server, "/cgi-bin/luci/admin/network/vpn", "<p>VPN</p>").await;

    assert!(matches!(
        client.get_vpn_state().await,
        Err(Error::FieldMissing { .. })
    ));
}

#[tokio::test]
async fn test_set_vpn_follows_redirect_and_restarts_firewall() {
    let (server, client) = setup().await;
    mount_page(&server, VPN_CONFIG, VPN_FORM).await;
    Mock::given(method("POST"))
        .and(path(VPN_CONFIG))
        .and(body_string_contains(part("cbid.vpn.config.enabled", "0").as_str()))
        .and(body_string_contains(part("cbi.cbe.vpn.config.enabled", "1").as_str()))
        .and(body_string_contains(part("cbid.vpn.config.port", "51820").as_str()))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/cgi-bin/luci/admin/network/vpn"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci/admin/network/vpn"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>VPN</p>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/servicectl/restart/firewall"))
        .and(body_string_contains("token=fedcba9876543210fedcba9876543210"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.set_vpn(false).await.unwrap());
}

#[tokio::test]
async fn test_set_vpn_rejects_unexpected_status() {
    let (server, client) = setup().await;
    mount_page(&server, VPN_CONFIG, VPN_FORM).await;
    Mock::given(method("POST"))
        .and(path(VPN_CONFIG))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    assert!(!client.set_vpn(true).await.unwrap());
}
