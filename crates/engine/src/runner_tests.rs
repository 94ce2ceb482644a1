// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::{DeleteOutcome, Registry};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tether_adapters::RecordingTransport;
use tether_core::{LastResult, SessionStatus};
use tether_storage::{RuntimePaths, StateStore};

const UUID_A: &str = "0a1b2c3d-4e5f-6789-abcd-ef0123456789";

struct Fixture {
    registry: Registry,
    transport: RecordingTransport,
    work_dir: std::path::PathBuf,
    _tmp: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let work_dir = tmp.path().join("work");
    std::fs::create_dir_all(&work_dir).unwrap();

    let transport = RecordingTransport::new();
    let store = StateStore::new(RuntimePaths::isolated(&tmp.path().join("rt")));
    let registry = Registry::new(store, Arc::new(transport.clone()), None);
    registry
        .create_session("s1", &work_dir.display().to_string())
        .await
        .unwrap();

    Fixture {
        registry,
        transport,
        work_dir,
        _tmp: tmp,
    }
}

fn install_fake_codex(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-codex.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    std::env::set_var("TETHER_CODEX_BIN", &path);
    path
}

async fn wait_until_running(registry: &Registry, name: &str) {
    for _ in 0..200 {
        if registry.is_running(name) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("session {name} never reached running state");
}

#[tokio::test]
#[serial]
async fn successful_run_captures_thread_id_and_sends_notice() {
    let f = fixture().await;
    let args_file = f._tmp.path().join("args.txt");
    std::env::set_var("TETHER_TEST_ARGS_FILE", &args_file);
    install_fake_codex(
        f._tmp.path(),
        &format!(
            r#"printf '%s\n' "$@" > "$TETHER_TEST_ARGS_FILE"
echo '{{"type":"thread.started","thread_id":"{UUID_A}"}}'
echo '{{"type":"item.completed","item":{{"type":"assistant_message","text":"hello from agent"}}}}'
exit 0"#
        ),
    );

    f.registry
        .run_prompt(1, 50, "s1", "hello", tether_core::RunMode::New)
        .await;
    std::env::remove_var("TETHER_CODEX_BIN");
    std::env::remove_var("TETHER_TEST_ARGS_FILE");

    let rec = f.registry.session("s1").unwrap();
    assert_eq!(rec.status, SessionStatus::Idle);
    assert_eq!(rec.last_result, LastResult::Success);
    assert_eq!(rec.thread_id.as_deref(), Some(UUID_A));
    assert!(rec.last_run_duration_s.is_some());

    // The agent got the full command line.
    let args = std::fs::read_to_string(&args_file).unwrap();
    assert!(args.contains("exec"));
    assert!(args.contains("--json"));
    assert!(args.contains("--model"));
    assert!(args.contains("--skip-git-repo-check"));
    assert!(args.contains(&f.work_dir.display().to_string()));
    assert!(args.trim_end().ends_with("hello"));

    // Stdout landed in the per-run log.
    let stdout_log = rec.last_stdout_log.unwrap();
    let log_content = std::fs::read_to_string(&stdout_log).unwrap();
    assert!(log_content.contains("thread.started"));

    // Output reached the stream and a completion notice was sent.
    assert!(f
        .transport
        .edits()
        .iter()
        .any(|e| e.text.contains("hello from agent")));
    assert!(f
        .transport
        .sends()
        .iter()
        .any(|m| m.text.contains("Run finished")));

    // The run is fully unwound.
    assert!(f.registry.run("s1").is_none());
    assert_eq!(f.registry.resolve_session_for_run_message(1, 50), None);
}

#[tokio::test]
#[serial]
async fn continue_run_resumes_the_stored_thread() {
    let f = fixture().await;
    let args_file = f._tmp.path().join("args.txt");
    std::env::set_var("TETHER_TEST_ARGS_FILE", &args_file);
    install_fake_codex(
        f._tmp.path(),
        r#"printf '%s\n' "$@" > "$TETHER_TEST_ARGS_FILE"
exit 0"#,
    );
    f.registry
        .update_session("s1", |rec| rec.thread_id = Some(UUID_A.to_string()));

    f.registry
        .run_prompt(1, 50, "s1", "more", tether_core::RunMode::Continue)
        .await;
    std::env::remove_var("TETHER_CODEX_BIN");
    std::env::remove_var("TETHER_TEST_ARGS_FILE");

    let args = std::fs::read_to_string(&args_file).unwrap();
    let lines: Vec<&str> = args.lines().collect();
    let pos = lines.iter().position(|l| *l == "resume").unwrap();
    assert_eq!(lines[pos + 1], UUID_A);
    assert_eq!(lines.last().copied(), Some("more"));
}

#[tokio::test]
#[serial]
async fn new_run_clears_the_stored_thread() {
    let f = fixture().await;
    let args_file = f._tmp.path().join("args.txt");
    std::env::set_var("TETHER_TEST_ARGS_FILE", &args_file);
    install_fake_codex(
        f._tmp.path(),
        r#"printf '%s\n' "$@" > "$TETHER_TEST_ARGS_FILE"
exit 0"#,
    );
    f.registry
        .update_session("s1", |rec| rec.thread_id = Some(UUID_A.to_string()));

    f.registry
        .run_prompt(1, 50, "s1", "fresh", tether_core::RunMode::New)
        .await;
    std::env::remove_var("TETHER_CODEX_BIN");
    std::env::remove_var("TETHER_TEST_ARGS_FILE");

    let args = std::fs::read_to_string(&args_file).unwrap();
    assert!(!args.lines().any(|l| l == "resume"));
}

#[tokio::test]
#[serial]
async fn failed_run_classifies_as_error() {
    let f = fixture().await;
    install_fake_codex(f._tmp.path(), "echo boom >&2\nexit 3");

    f.registry
        .run_prompt(1, 50, "s1", "x", tether_core::RunMode::New)
        .await;
    std::env::remove_var("TETHER_CODEX_BIN");

    let rec = f.registry.session("s1").unwrap();
    assert_eq!(rec.status, SessionStatus::Error);
    assert_eq!(rec.last_result, LastResult::Error);

    let stderr_log = rec.last_stderr_log.unwrap();
    let content = std::fs::read_to_string(&stderr_log).unwrap();
    assert!(content.contains("boom"));
}

#[tokio::test]
#[serial]
async fn stop_terminates_the_run_and_classifies_stopped() {
    let f = fixture().await;
    install_fake_codex(f._tmp.path(), "sleep 30");

    let registry = f.registry.clone();
    let run_task = tokio::spawn(async move {
        registry
            .run_prompt(1, 50, "s1", "long", tether_core::RunMode::New)
            .await;
    });

    wait_until_running(&f.registry, "s1").await;
    assert!(f.registry.stop("s1").await);
    run_task.await.unwrap();
    std::env::remove_var("TETHER_CODEX_BIN");

    let rec = f.registry.session("s1").unwrap();
    assert_eq!(rec.status, SessionStatus::Stopped);
    assert_eq!(rec.last_result, LastResult::Stopped);
    assert!(rec.last_run_duration_s.is_some());
}

#[tokio::test]
#[serial]
async fn delete_while_running_completes_after_the_run() {
    let f = fixture().await;
    install_fake_codex(f._tmp.path(), "sleep 30");

    let registry = f.registry.clone();
    let run_task = tokio::spawn(async move {
        registry
            .run_prompt(1, 50, "s1", "long", tether_core::RunMode::New)
            .await;
    });

    wait_until_running(&f.registry, "s1").await;
    let outcome = f.registry.delete_session("s1").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::StopRequested);
    assert!(f.registry.session("s1").unwrap().pending_delete);

    run_task.await.unwrap();
    std::env::remove_var("TETHER_CODEX_BIN");

    assert!(!f.registry.has_session("s1"));
    let log_dir = f.registry.paths().log_dir;
    if let Ok(entries) = std::fs::read_dir(&log_dir) {
        assert!(
            !entries
                .flatten()
                .any(|e| e.file_name().to_string_lossy().starts_with("s1_")),
            "artifacts of the deleted session must be gone"
        );
    }
}

#[tokio::test]
#[serial]
async fn spawn_failure_marks_the_session_errored() {
    let f = fixture().await;
    std::env::set_var("TETHER_CODEX_BIN", "/nonexistent/bin/codex");

    f.registry
        .run_prompt(1, 50, "s1", "x", tether_core::RunMode::New)
        .await;
    std::env::remove_var("TETHER_CODEX_BIN");

    let rec = f.registry.session("s1").unwrap();
    assert_eq!(rec.status, SessionStatus::Error);
    assert_eq!(rec.last_result, LastResult::Error);

    let stderr_log = rec.last_stderr_log.unwrap();
    let content = std::fs::read_to_string(&stderr_log).unwrap();
    assert!(content.contains("not found in PATH"));
}

#[tokio::test]
#[serial]
async fn second_prompt_while_running_is_ignored() {
    let f = fixture().await;
    install_fake_codex(f._tmp.path(), "sleep 30");

    let registry = f.registry.clone();
    let run_task = tokio::spawn(async move {
        registry
            .run_prompt(1, 50, "s1", "first", tether_core::RunMode::New)
            .await;
    });
    wait_until_running(&f.registry, "s1").await;

    // One-run-per-session: the second call returns immediately.
    f.registry
        .run_prompt(1, 50, "s1", "second", tether_core::RunMode::New)
        .await;
    assert!(f.registry.is_running("s1"));

    f.registry.stop("s1").await;
    run_task.await.unwrap();
    std::env::remove_var("TETHER_CODEX_BIN");
}
