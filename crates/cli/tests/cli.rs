use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::TcpListener;
use tempfile::TempDir;

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("addr"));
    drop(listener);
    url
}

/// Answer every connection with `200 {}` until the test process exits.
fn healthy_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("addr"));
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buffer = [0u8; 4096];
            let _ = stream.read(&mut buffer);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
            );
        }
    });
    url
}

fn shell(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("aparetext-shell");
    cmd.env_remove("RUST_LOG")
        .env_remove("APARETEXT_BACKEND_URL")
        .env_remove("APARETEXT_PROBE_TRANSPORT")
        .env_remove("APARETEXT_MODE")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(dir.path().join("shell.toml"))
        .arg("--log-dir")
        .arg(dir.path().join("logs"));
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = cargo_bin_cmd!("aparetext-shell");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ApareText desktop shell core"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("--dev"))
        .stdout(predicate::str::contains("--worker"));
}

#[test]
fn test_cli_probe_help() {
    let mut cmd = cargo_bin_cmd!("aparetext-shell");
    cmd.args(["probe", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--attempts"))
        .stdout(predicate::str::contains("--interval-ms"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_probe_without_backend_fails() {
    let dir = TempDir::new().expect("temp dir");
    shell(&dir)
        .env("APARETEXT_BACKEND_URL", closed_port_url())
        .args(["probe", "--attempts", "2", "--interval-ms", "10"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Waiting for backend... (1/2)"))
        .stdout(predicate::str::contains("Not ready:"));
}

#[test]
fn test_probe_reports_ready_backend_as_json() {
    let dir = TempDir::new().expect("temp dir");
    shell(&dir)
        .env("APARETEXT_BACKEND_URL", healthy_backend())
        .args(["probe", "--json", "--attempts", "3", "--interval-ms", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""state":"READY""#));
}

#[test]
fn test_run_quits_when_backend_never_ready() {
    let dir = TempDir::new().expect("temp dir");
    shell(&dir)
        .env("APARETEXT_BACKEND_URL", closed_port_url())
        .args(["--dev", "run", "--attempts", "1", "--interval-ms", "10"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Starting backend..."))
        .stderr(predicate::str::contains("Backend did not become ready"));
}

#[test]
fn test_json_events_use_the_renderer_wire_format() {
    let dir = TempDir::new().expect("temp dir");
    shell(&dir)
        .env("APARETEXT_BACKEND_URL", closed_port_url())
        .args(["--json-events", "--dev", "run", "--attempts", "1", "--interval-ms", "10"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            r#"{"channel":"loading-update","payload":{"message":"Starting backend...","progress":10}}"#,
        ))
        .stdout(predicate::str::contains("[ 10%]").not());
}

#[test]
fn test_run_with_missing_worker_is_a_configuration_error() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("no-such-server");
    shell(&dir)
        .env("APARETEXT_BACKEND_URL", closed_port_url())
        .arg("--worker")
        .arg(&missing)
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("no-such-server"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("shell.toml"), "mode = [").expect("write config");
    shell(&dir).arg("probe").assert().failure();
}
