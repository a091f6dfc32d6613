// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box specs: spawn the real `kandevd` binary against a scratch
//! `KANDEV_HOME`, drive it with `kandevctl`, assert on what comes back.
//! No in-process shortcuts — these exercise the actual WebSocket wire.

use assert_cmd::Command;
use std::net::TcpListener;
use std::process::Child;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Daemon {
    child: Child,
    addr: String,
    #[allow(dead_code)]
    home: TempDir,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr.to_string()
}

fn spawn_daemon() -> Daemon {
    let home = TempDir::new().expect("scratch KANDEV_HOME");
    let addr = free_addr();

    let bin = assert_cmd::cargo::cargo_bin("kandevd");
    let child = std::process::Command::new(bin)
        .env("KANDEV_HOME", home.path())
        .env("KANDEV_LISTEN_ADDR", &addr)
        .spawn()
        .expect("spawn kandevd");

    wait_for_healthz(&addr);
    Daemon { child, addr, home }
}

fn wait_for_healthz(addr: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let url = format!("http://{addr}/healthz");
    loop {
        if let Ok(mut stream) = std::net::TcpStream::connect(addr) {
            use std::io::{Read, Write};
            let request = format!("GET /healthz HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
            if stream.write_all(request.as_bytes()).is_ok() {
                let mut response = String::new();
                let _ = stream.read_to_string(&mut response);
                if response.starts_with("HTTP/1.1 200") {
                    return;
                }
            }
        }
        if Instant::now() > deadline {
            panic!("kandevd never answered {url}");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn status_reports_no_tasks_on_a_fresh_daemon() {
    let daemon = spawn_daemon();

    let mut cmd = Command::cargo_bin("kandevctl").unwrap();
    let assert = cmd.arg("--addr").arg(&daemon.addr).arg("status").assert().success();

    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(output.contains("No tasks"), "unexpected status output: {output}");
}

#[test]
fn status_as_json_is_parseable_and_empty() {
    let daemon = spawn_daemon();

    let mut cmd = Command::cargo_bin("kandevctl").unwrap();
    let assert = cmd.arg("--addr").arg(&daemon.addr).arg("--output").arg("json").arg("status").assert().success();

    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(output.trim()).expect("valid json");
    let tasks = value.as_array().expect("tasks array");
    assert!(tasks.is_empty());
}

#[test]
fn cancel_on_unknown_session_fails_with_nonzero_exit() {
    let daemon = spawn_daemon();

    let mut cmd = Command::cargo_bin("kandevctl").unwrap();
    cmd.arg("--addr").arg(&daemon.addr).arg("cancel").arg("tsk-does-not-exist").assert().failure();
}

#[test]
fn kandevctl_refuses_to_connect_to_a_dead_address() {
    let addr = free_addr();

    let mut cmd = Command::cargo_bin("kandevctl").unwrap();
    cmd.arg("--addr").arg(&addr).arg("status").assert().failure();
}
