//! End-to-end tests through the route table and JSON dispatcher - the same
//! surface the transport layer drives.

use std::time::{Duration, Instant};

use havoc::{Harness, Method, ReplyCode};

#[test]
fn test_start_reply_carries_clamped_config() {
    let harness = Harness::new();
    let reply = harness.handle(
        "/burn/start",
        Method::Post,
        Some(r#"{"threads": 2, "intensity": 500}"#),
    );
    assert_eq!(reply.code, ReplyCode::Ok);
    assert_eq!(reply.body["intensity"], 100);
    assert_eq!(reply.body["threads"], 2);
    assert_eq!(reply.body["running"], true);

    let reply = harness.handle(
        "/burn/start",
        Method::Post,
        Some(r#"{"threads": 1, "intensity": -5}"#),
    );
    assert_eq!(reply.body["intensity"], 1);

    assert_eq!(
        harness.handle("/burn/stop", Method::Post, None).code,
        ReplyCode::Ok
    );
    let status = harness.handle("/burn/status", Method::Get, None);
    assert_eq!(status.body["running"], false);
    assert_eq!(status.body["threads"], 0);
}

#[test]
fn test_unknown_operation_is_not_found() {
    let harness = Harness::new();
    let reply = harness.handle("/burn/start", Method::Get, None);
    assert_eq!(reply.code, ReplyCode::NotFound);
    assert_eq!(reply.body["error"], "not_found");
}

#[test]
fn test_malformed_config_is_bad_request() {
    let harness = Harness::new();
    let reply = harness.handle("/mem/start", Method::Post, Some(r#"{"target_mb": "many"}"#));
    assert_eq!(reply.code, ReplyCode::BadRequest);
    assert_eq!(reply.body["error"], "bad_request");
    assert!(!harness.mem_retain.status().running);
}

#[test]
fn test_deadlock_limit_surfaces_as_reply() {
    havoc_test_support::init_tracing();
    let harness = Harness::new();
    for n in 1..=3u32 {
        let reply = harness.handle("/deadlock/start", Method::Post, None);
        assert_eq!(reply.code, ReplyCode::Ok);
        assert_eq!(reply.body["created"], n);
    }

    let reply = harness.handle("/deadlock/start", Method::Post, None);
    assert_eq!(reply.code, ReplyCode::LimitReached);
    assert_eq!(reply.code.http_status(), 429);
    assert_eq!(reply.body["error"], "limit_reached");

    let status = harness.handle("/deadlock/status", Method::Get, None);
    assert_eq!(status.body["created"], 3);
}

#[test]
fn test_work_unit_reflects_starvation() {
    let harness = Harness::new();

    // healthy: a 10ms unit completes promptly
    let started = Instant::now();
    let reply = harness.handle("/work", Method::Get, Some(r#"{"ms": 10}"#));
    assert_eq!(reply.code, ReplyCode::Ok);
    assert!(started.elapsed() < Duration::from_millis(500));

    // starved: the same unit takes at least the configured sleep
    harness.handle("/block/start", Method::Post, Some(r#"{"sleep_ms": 600}"#));
    let started = Instant::now();
    harness.handle("/work", Method::Get, Some(r#"{"ms": 10}"#));
    assert!(started.elapsed() >= Duration::from_millis(600));

    harness.handle("/block/stop", Method::Post, None);
    assert_eq!(
        harness.handle("/block/status", Method::Get, None).body["blocking"],
        false
    );
}

#[test]
fn test_cpu_one_shot_reports_rounds() {
    let harness = Harness::new();
    let reply = harness.handle("/cpu", Method::Get, Some(r#"{"ms": 20}"#));
    assert_eq!(reply.code, ReplyCode::Ok);
    assert!(reply.body["rounds"].as_u64().unwrap() > 0);
    // the one-shot never touches the pool
    assert!(!harness.cpu_burn.status().running);
}

#[test]
fn test_io_one_shot_writes_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let body = serde_json::json!({"mb": 1, "fsync": false, "dir": dir.path()}).to_string();
    let reply = harness.handle("/io/once", Method::Get, Some(&body));
    assert_eq!(reply.code, ReplyCode::Ok);
    assert_eq!(reply.body["bytes_written"], 1024 * 1024);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_fd_leak_via_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let body = serde_json::json!({"open_per_sec": 500, "max": 3, "dir": dir.path()}).to_string();
    let reply = harness.handle("/fd/start", Method::Post, Some(&body));
    assert_eq!(reply.body["max"], 3);

    assert!(havoc_test_support::wait_for(
        Duration::from_secs(2),
        || harness.fd_leak.status().opened == 3
    ));
    harness.handle("/fd/stop", Method::Post, None);
    assert_eq!(
        harness.handle("/fd/status", Method::Get, None).body["opened"],
        0
    );
}

#[test]
fn test_liveness_and_identity() {
    let harness = Harness::new();
    let health = harness.handle("/health", Method::Get, None);
    assert_eq!(health.code, ReplyCode::Ok);
    assert_eq!(health.body["ok"], true);

    let pid = harness.handle("/pid", Method::Get, None);
    assert_eq!(pid.body["pid"], std::process::id());
    assert!(pid.body["version"].is_string());
}
