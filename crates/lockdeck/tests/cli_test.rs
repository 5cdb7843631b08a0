//! Integration tests for the `lockdeck` CLI binary.
//!
//! Most cases need no backend. The few that do run against a wiremock
//! server passed in with `--api-url`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `lockdeck` binary with env isolation.
///
/// Clears all `LOCKDECK_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn lockdeck_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("lockdeck");
    cmd.env("HOME", "/tmp/lockdeck-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/lockdeck-cli-test-nonexistent")
        .env_remove("LOCKDECK_PROFILE")
        .env_remove("LOCKDECK_API_URL")
        .env_remove("LOCKDECK_USERNAME")
        .env_remove("LOCKDECK_PASSWORD")
        .env_remove("LOCKDECK_OUTPUT")
        .env_remove("LOCKDECK_INSECURE")
        .env_remove("LOCKDECK_TIMEOUT")
        .env_remove("LOCKDECK_NEW_USER_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "token": "access-1",
                "user": { "id": 1, "username": "admin", "role": "admin" }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/locks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                {
                    "id": 1,
                    "name": "Front Door",
                    "is_online": true,
                    "status": { "is_locked": true, "battery_level": 90 }
                },
                {
                    "id": 2,
                    "name": "Garage",
                    "is_online": false,
                    "status": { "is_locked": false, "battery_level": 12 }
                }
            ]
        })))
        .mount(&server)
        .await;

    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let uri = server.uri();
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    tokio::task::spawn_blocking(move || {
        lockdeck_cmd()
            .args(["--api-url", &uri, "--username", "admin", "--color", "never"])
            .env("LOCKDECK_PASSWORD", "hunter2")
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = lockdeck_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    lockdeck_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("door locks")
            .and(predicate::str::contains("locks"))
            .and(predicate::str::contains("notifications"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    lockdeck_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lockdeck"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    lockdeck_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    lockdeck_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = lockdeck_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error naming the subcommand:\n{text}");
}

#[test]
fn test_locks_list_without_backend_config() {
    lockdeck_cmd()
        .args(["locks", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backend configured"));
}

#[test]
fn test_unknown_profile() {
    lockdeck_cmd()
        .args(["--profile", "nowhere", "summary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_invalid_lock_filter() {
    let output = lockdeck_cmd()
        .args(["locks", "list", "--filter", "sideways"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_config_show_no_config() {
    lockdeck_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_use_unknown_profile() {
    lockdeck_cmd()
        .args(["config", "use", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_locks_list_plain() {
    let server = backend().await;

    let output = run_against(&server, &["-o", "plain", "locks", "list"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1\n2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_locks_list_offline_filter_json() {
    let server = backend().await;

    let output =
        run_against(&server, &["-o", "json", "locks", "list", "--filter", "offline"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let locks: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let locks = locks.as_array().unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0]["name"], "Garage");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unlock_offline_lock_is_refused() {
    let server = backend().await;

    let output = run_against(&server, &["locks", "unlock", "2"]).await;
    assert_eq!(output.status.code(), Some(6), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("offline"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_summary_json() {
    let server = backend().await;

    let output = run_against(&server, &["-o", "json", "summary"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["online"], 1);
    assert_eq!(summary["locked"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_reports_user() {
    let server = backend().await;

    let output = run_against(&server, &["login"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Logged in as admin (admin)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_users_list_plain() {
    let server = backend().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [
                { "id": 1, "username": "admin", "role": "admin" },
                { "id": 7, "username": "guest", "role": "guest" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["-o", "plain", "users", "list"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "admin\nguest");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_users_create_sends_password() {
    let server = backend().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_json(json!({
            "username": "frontdesk",
            "role": "manager",
            "name": "Front Desk",
            "password": "desk123"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "success",
            "data": { "id": 12, "username": "frontdesk", "role": "manager", "name": "Front Desk" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(
        &server,
        &[
            "-o",
            "json",
            "users",
            "create",
            "frontdesk",
            "--role",
            "manager",
            "--name",
            "Front Desk",
            "--new-password",
            "desk123",
        ],
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let user: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(user["id"], 12);
    assert_eq!(user["role"], "manager");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_users_update_without_fields_is_usage_error() {
    let server = backend().await;

    let output = run_against(&server, &["users", "update", "12"]).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_users_refused_for_guest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "token": "access-guest",
                "user": { "id": 4, "username": "guest", "role": "guest" }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_against(&server, &["users", "list"]).await;
    assert_eq!(output.status.code(), Some(5), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("admin role required"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bad_credentials_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "message": "Invalid credentials"
        })))
        .mount(&server)
        .await;

    let output = run_against(&server, &["summary"]).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}
