//! Integration tests for the `cudy` CLI binary.
//!
//! Argument parsing, help output, completions and error exits run without a
//! router. The end-to-end cases stand up a wiremock LuCI.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `cudy` binary with env isolation.
///
/// Clears all `CUDY_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn cudy_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("cudy");
    cmd.env("HOME", "/tmp/cudy-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/cudy-cli-test-nonexistent")
        .env_remove("CUDY_PROFILE")
        .env_remove("CUDY_HOST")
        .env_remove("CUDY_USERNAME")
        .env_remove("CUDY_PASSWORD")
        .env_remove("CUDY_MODEL")
        .env_remove("CUDY_OUTPUT")
        .env_remove("CUDY_VERIFY_TLS")
        .env_remove("CUDY_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const SYSTEM_PAGE: &str = r"<table>
    <tr><td>Model</td><td>Cudy WR6500</td></tr>
    <tr><td>Firmware Version</td><td>2.3.1</td></tr>
    </table>";

const DEVLIST_PAGE: &str = r"<table><tbody>
    <tr><td>laptop</td><td>192.168.10.20</td><td>AA:BB:CC:00:11:22</td><td>WiFi 5G</td></tr>
    </tbody></table>";

async fn mock_router() -> MockServer {
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
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci/admin/system/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SYSTEM_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/luci/admin/network/devices/devlist"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DEVLIST_PAGE))
        .mount(&server)
        .await;
    server
}

/// Run the binary off the runtime so the mock server keeps serving.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let mut cmd = cudy_cmd();
    cmd.args(["--host", &server.uri(), "--password", "secret", "-m", "wr6500"])
        .args(args);
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = cudy_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    cudy_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Cudy routers")
            .and(predicate::str::contains("snapshot"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("wifi")),
    );
}

#[test]
fn test_version_flag() {
    cudy_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cudy"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    cudy_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    cudy_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_band() {
    let output = cudy_cmd().args(["wifi", "on", "6g"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_devices_without_router() {
    let output = cudy_cmd().arg("devices").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("No router configured"),
        "Expected config hint:\n{text}"
    );
}

#[test]
fn test_unknown_profile() {
    let output = cudy_cmd()
        .args(["--profile", "office", "snapshot"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("office"));
}

#[test]
fn test_config_path() {
    cudy_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Against a mock router ───────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_json() {
    let server = mock_router().await;
    let output = run_against(&server, &["devices", "-o", "json"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let list = devices.as_array().unwrap();
    assert_eq!(list.len(), 1);
    let text = list[0].to_string();
    assert!(text.contains("laptop"));
    assert!(text.contains("192.168.10.20"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_snapshot_plain() {
    let server = mock_router().await;
    let output = run_against(&server, &["snapshot", "--module", "system", "-o", "plain"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2.3.1"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_absent_device_exits_not_found() {
    let server = mock_router().await;
    let output = run_against(&server, &["devices", "present", "11:22:33:44:55:66"]).await;
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reboot_needs_yes_when_not_a_tty() {
    let server = mock_router().await;
    let output = run_against(&server, &["reboot"]).await;
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}
