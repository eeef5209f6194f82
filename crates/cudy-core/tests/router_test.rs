#![allow(clippy::unwrap_used)]
// Integration tests for the `Router` lifecycle using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cudy_core::{
    ConnectionState, CoreError, ModelFamily, Module, Router, RouterConfig, TlsVerification,
};

// ── Helpers ─────────────────────────────────────────────────────────

const SYSTEM_STATUS: &str = "/cgi-bin/luci/admin/system/status";
const DEVLIST: &str = "/cgi-bin/luci/admin/network/devices/devlist";
const VPN_CONFIG: &str = "/cgi-bin/luci/admin/network/vpn/config";

const SYSTEM_PAGE: &str = r"<table>
    <tr><td>Model</td><td>Cudy WR6500</td></tr>
    <tr><td>Firmware Version</td><td>2.3.1</td></tr>
    <tr><td>Uptime</td><td>1d 02:03:04</td></tr>
    </table>";

const DEVLIST_PAGE: &str = r"<table><tbody>
    <tr><td>laptop</td><td>192.168.10.20</td><td>AA:BB:CC:00:11:22</td><td>WiFi 5G</td></tr>
    </tbody></table>";

fn config_for(server: &MockServer, model: Option<ModelFamily>) -> RouterConfig {
    RouterConfig {
        host: server.uri(),
        password: "secret".to_string().into(),
        model,
        tls: TlsVerification::SystemDefaults,
        timeout: Duration::from_secs(5),
        poll_interval: Duration::ZERO,
        service_restart_timeout: Duration::from_millis(200),
        ..RouterConfig::default()
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Set-Cookie", "sysauth=abc123; path=/"),
        )
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

/// Login plus a system page and one connected device.
async fn setup_router() -> MockServer {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_page(&server, SYSTEM_STATUS, SYSTEM_PAGE).await;
    mount_page(&server, DEVLIST, DEVLIST_PAGE).await;
    server
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_connect_publishes_first_snapshot() {
    let server = setup_router().await;
    let router = Router::new(config_for(&server, Some(ModelFamily::Wr6500))).unwrap();
    let state = router.connection_state();

    router.connect().await.unwrap();

    assert_eq!(*state.borrow(), ConnectionState::Connected);
    assert_eq!(router.family(), ModelFamily::Wr6500);
    assert_eq!(router.model().unwrap().raw, None);

    let snapshot = router.snapshot();
    let system = snapshot.record(Module::System).unwrap();
    assert_eq!(system.text("model"), Some("Cudy WR6500"));
    assert_eq!(system.text("firmware_version"), Some("2.3.1"));

    let devices = router.devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].hostname, "laptop");
    assert_eq!(devices[0].ip, "192.168.10.20");

    router.disconnect().await;
    assert_eq!(*state.borrow(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_detects_model_family() {
    let server = setup_router().await;
    let router = Router::new(config_for(&server, None)).unwrap();

    router.connect().await.unwrap();

    let model = router.model().unwrap();
    assert_eq!(model.family, ModelFamily::Wr6500);
    assert_eq!(model.raw.as_deref(), Some("Cudy WR6500"));
    router.disconnect().await;
}

#[tokio::test]
async fn test_rejected_login_marks_router_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form></form>"))
        .mount(&server)
        .await;

    let router = Router::new(config_for(&server, Some(ModelFamily::Wr6500))).unwrap();
    let result = router.connect().await;

    assert!(
        matches!(result, Err(CoreError::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
    assert!(matches!(
        *router.connection_state().borrow(),
        ConnectionState::Unavailable { .. }
    ));
}

#[tokio::test]
async fn test_router_without_pages_has_empty_snapshot() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let router = Router::new(config_for(&server, Some(ModelFamily::R700))).unwrap();
    let result = router.connect().await;

    assert!(matches!(result, Err(CoreError::EmptySnapshot)));
    assert!(matches!(
        *router.connection_state().borrow(),
        ConnectionState::Unavailable { .. }
    ));
}

// ── Device presence ─────────────────────────────────────────────────

#[tokio::test]
async fn test_device_lookup_ignores_case_and_separator() {
    let server = setup_router().await;
    let router = Router::new(config_for(&server, Some(ModelFamily::Wr6500))).unwrap();
    router.connect().await.unwrap();

    assert!(router.is_connected("aa-bb-cc-00-11-22"));
    assert_eq!(router.device("aa:bb:cc:00:11:22").unwrap().hostname, "laptop");
    assert!(!router.is_connected("11:22:33:44:55:66"));
    assert!(matches!(
        router.device("11:22:33:44:55:66"),
        Err(CoreError::DeviceNotFound { .. })
    ));
    router.disconnect().await;
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_commands_require_connection() {
    let server = setup_router().await;
    let router = Router::new(config_for(&server, Some(ModelFamily::Wr6500))).unwrap();

    assert!(matches!(router.set_vpn(true).await, Err(CoreError::NotConnected)));
    assert!(matches!(router.refresh().await, Err(CoreError::NotConnected)));
}

#[tokio::test]
async fn test_vpn_change_refreshes_snapshot() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    mount_page(&server, DEVLIST, DEVLIST_PAGE).await;
    Mock::given(method("GET"))
        .and(path(SYSTEM_STATUS))
        .respond_with(ResponseTemplate::new(200).set_body_string(SYSTEM_PAGE))
        .expect(2)
        .mount(&server)
        .await;
    mount_page(
        &server,
        VPN_CONFIG,
        r#"<form name="cbi" method="post">
        <input type="hidden" name="token" value="fedcba9876543210fedcba9876543210">
        <input type="hidden" name="cbid.vpn.config.enabled" value="0">
        </form>"#,
    )
    .await;
    Mock::given(method("POST"))
        .and(path(VPN_CONFIG))
        .and(body_string_contains("cbid.vpn.config.enabled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>saved</p>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/servicectl/restart/firewall"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let router = Router::new(config_for(&server, Some(ModelFamily::Wr6500))).unwrap();
    router.connect().await.unwrap();
    let mut snapshots = router.snapshots();
    snapshots.borrow_and_update();

    router.set_vpn(true).await.unwrap();

    assert!(snapshots.has_changed().unwrap());
    router.disconnect().await;
}

#[tokio::test]
async fn test_refused_reboot_is_an_error() {
    let server = setup_router().await;
    Mock::given(method("POST"))
        .and(path("/cgi-bin/luci/admin/system/reboot"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let router = Router::new(config_for(&server, Some(ModelFamily::Wr6500))).unwrap();
    router.connect().await.unwrap();

    let result = router.reboot().await;
    assert!(
        matches!(&result, Err(CoreError::Rejected { operation }) if operation == "reboot"),
        "expected Rejected, got: {result:?}"
    );
    router.disconnect().await;
}

#[tokio::test]
async fn test_oneshot_connects_and_disconnects() {
    let server = setup_router().await;
    let config = RouterConfig {
        poll_interval: Duration::from_secs(60),
        ..config_for(&server, Some(ModelFamily::Wr6500))
    };

    let count = Router::oneshot(config, |router| async move { Ok(router.devices().len()) })
        .await
        .unwrap();
    assert_eq!(count, 1);
}
