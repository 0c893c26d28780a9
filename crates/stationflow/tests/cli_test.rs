//! Integration tests for the `stationflow` CLI binary.
//!
//! Parsing, help, completions and error paths run without a backend; the
//! station commands run against a wiremock server passed via `--api-url`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const NOWHERE: &str = "/tmp/stationflow-cli-test-nonexistent";

/// The `stationflow` binary with config, data dirs and env isolated.
fn sf_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("stationflow");
    cmd.env("HOME", NOWHERE)
        .env("XDG_CONFIG_HOME", NOWHERE)
        .env("XDG_DATA_HOME", NOWHERE)
        .env("NO_COLOR", "1")
        .env_remove("STATIONFLOW_PROFILE")
        .env_remove("STATIONFLOW_API_URL")
        .env_remove("STATIONFLOW_OUTPUT")
        .env_remove("STATIONFLOW_INSECURE")
        .env_remove("STATIONFLOW_TIMEOUT")
        .env_remove("STATIONFLOW_USERNAME")
        .env_remove("STATIONFLOW_PASSWORD");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn station_json(id: &str, kind: &str, available: i64) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("Station {id}"),
        "type": kind,
        "location": { "lat": 41.02, "lng": 29.01 },
        "capacity": 30,
        "available": available,
        "status": "active"
    })
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            station_json("s1", "bus", 12),
            station_json("s2", "hovercraft", 3),
            station_json("s3", "bike", 4)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stations/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(station_json("s1", "bus", 12)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stations/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Station not found" })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_usage() {
    let output = sf_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    sf_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("stations")
            .and(predicate::str::contains("route"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    sf_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stationflow"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    sf_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    sf_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    sf_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = sf_cmd().arg("teleport").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("teleport"));
}

#[test]
fn test_invalid_output_format() {
    let output = sf_cmd().args(["-o", "xml", "stations", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("xml"));
}

#[test]
fn test_stations_list_without_config() {
    let output = sf_cmd().args(["stations", "list"]).output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output).to_lowercase();
    assert!(text.contains("config"), "expected a config hint:\n{text}");
}

#[test]
fn test_radius_requires_near() {
    let output = sf_cmd()
        .args(["stations", "list", "--radius", "500"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_bad_coordinate_is_a_usage_error() {
    let output = sf_cmd()
        .args(["--api-url", "http://127.0.0.1:9/api", "route", "s1", "--from", "north"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("from"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_without_file() {
    sf_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_path() {
    sf_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_use_unknown_profile() {
    let output = sf_cmd().args(["config", "use", "staging"]).output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("staging"));
}

// ── Against a mocked backend ────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_stations_list_plain_skips_unknown_types() {
    let server = backend().await;
    let api = format!("{}/api", server.uri());

    let output = sf_cmd()
        .args(["--api-url", &api, "-o", "plain", "stations", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut ids: Vec<&str> = stdout.lines().collect();
    ids.sort_unstable();
    assert_eq!(ids, ["s1", "s3"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stations_list_filters_by_type() {
    let server = backend().await;
    let api = format!("{}/api", server.uri());

    let output = sf_cmd()
        .args(["--api-url", &api, "-o", "json", "stations", "list", "--type", "bike"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], "s3");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stations_show_detail() {
    let server = backend().await;
    let api = format!("{}/api", server.uri());

    sf_cmd()
        .args(["--api-url", &api, "stations", "show", "s1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Station s1").and(predicate::str::contains("12/30")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stations_show_missing_exits_not_found() {
    let server = backend().await;
    let api = format!("{}/api", server.uri());

    let output = sf_cmd()
        .args(["--api-url", &api, "stations", "show", "nope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_without_session() {
    let server = backend().await;
    let api = format!("{}/api", server.uri());

    let output = sf_cmd().args(["--api-url", &api, "auth", "whoami"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[test]
fn test_config_set_writes_profile() {
    let home = tempfile::tempdir().unwrap();
    let run = |args: &[&str]| {
        sf_cmd()
            .env("HOME", home.path())
            .env("XDG_CONFIG_HOME", home.path().join("config"))
            .env("XDG_DATA_HOME", home.path().join("data"))
            .args(args)
            .assert()
    };

    run(&["config", "set", "api_url", "http://transit.example/api"]).success();
    run(&["config", "profiles"])
        .success()
        .stdout(predicate::str::contains("default *").and(predicate::str::contains("http://transit.example/api")));
    run(&["config", "set", "timeout", "soon"]).failure();
}
