#![allow(clippy::unwrap_used)]
// Integration tests for the capability probe using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cudy_api::{
    ClientConfig, LuciClient, ModelFamily, Module, ProfileTable, TransportConfig, detect_model,
    get_snapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

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
    let config = ClientConfig::new(server.uri(), "admin", password);
    let transport = TransportConfig {
        timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    };
    let client = LuciClient::new(config, &transport).unwrap();
    (server, client)
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

fn kv_table(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(k, v)| format!("<tr><td>{k}</td><td>{v}</td></tr>"))
        .collect();
    format!("<table>{body}</table>")
}

// ── Snapshot ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generic_snapshot_keeps_only_answering_modules() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        "/cgi-bin/luci/admin/system/status",
        &kv_table(&[("Model", "R700"), ("Firmware Version", "2.1.0")]),
    )
    .await;
    mount_page(
        &server,
        "/cgi-bin/luci/admin/network/lan/status",
        &kv_table(&[("IP Address", "192.168.10.1"), ("Subnet Mask", "255.255.255.0")]),
    )
    .await;

    let snapshot = client.get_snapshot().await.unwrap();

    assert_eq!(
        snapshot.modules().collect::<Vec<_>>(),
        vec![Module::System, Module::Lan]
    );
    assert_eq!(
        snapshot.record(Module::Lan).unwrap().text("subnet"),
        Some("255.255.255.0")
    );
    assert!(snapshot.devices().is_empty());
}

#[tokio::test]
async fn test_shell_page_fragments_are_fetched() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        "/cgi-bin/luci/admin/system/status",
        r"<div id='sys'></div>
        <script>cbi_xhr_load('#sys', 'replace', '/cgi-bin/luci/admin/system/sysinfo', 'part=sys');</script>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci/admin/system/sysinfo"))
        .and(query_param("part", "sys"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(kv_table(&[("Uptime", "3h 4m")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = get_snapshot(&client, ModelFamily::R700).await.unwrap();
    assert_eq!(
        snapshot.record(Module::System).unwrap().text("uptime"),
        Some("3h 4m")
    );
}

// ── Model detection ─────────────────────────────────────────────────

#[tokio::test]
async fn test_detect_model_falls_back_to_overview() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        "/cgi-bin/luci/admin/status/overview",
        "<div>Model: Cudy P5 V1.0\n</div>",
    )
    .await;

    let model = detect_model(&client, &ProfileTable::builtin()).await.unwrap();
    assert_eq!(model.family, ModelFamily::P5);
    assert_eq!(model.raw.as_deref(), Some("Cudy P5 V1.0"));
}

#[tokio::test]
async fn test_unknown_model_uses_generic_profile() {
    let (server, client) = setup().await;
    mount_page(
        &server,
        "/cgi-bin/luci/admin/system/status",
        &kv_table(&[("Model", "LT500")]),
    )
    .await;

    let model = detect_model(&client, &ProfileTable::builtin()).await.unwrap();
    assert_eq!(model.family, ModelFamily::Generic);
    assert_eq!(model.raw.as_deref(), Some("LT500"));
}
