// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tether_core::SessionRecord;

fn test_paths() -> RuntimePaths {
    RuntimePaths::isolated(std::path::Path::new("/rt"))
}

fn snapshot_with(rec: SessionRecord) -> StateSnapshot {
    let mut snapshot = StateSnapshot::default();
    snapshot.sessions.insert(rec.name.clone(), rec);
    snapshot
}

#[test]
fn document_round_trips_through_save_shape() {
    let mut rec = SessionRecord::new("alpha", "/srv/app");
    rec.thread_id = Some("0a1b2c3d-4e5f-6789-abcd-ef0123456789".into());
    rec.last_result = LastResult::Success;
    rec.last_run_duration_s = Some(17);
    let mut snapshot = snapshot_with(rec);
    snapshot.owner_id = Some(42);
    snapshot.panel_by_chat.insert(-100123, 55);
    snapshot.path_presets.push("/srv".into());

    let json = snapshot.to_document_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["version"], STATE_VERSION);
    assert_eq!(value["panel_by_chat"]["-100123"], 55);

    let restored = StateSnapshot::from_document(&value, &test_paths());
    assert_eq!(restored, snapshot);
}

#[test]
fn running_status_is_persisted_as_idle() {
    let mut rec = SessionRecord::new("alpha", "/srv/app");
    rec.status = SessionStatus::Running;
    let snapshot = snapshot_with(rec);

    let json = snapshot.to_document_json().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["sessions"]["alpha"]["status"], "idle");
}

#[test]
fn load_heals_running_status_to_idle() {
    let value = serde_json::json!({
        "sessions": {"s": {"path": "/p", "status": "running"}}
    });
    let snapshot = StateSnapshot::from_document(&value, &test_paths());
    assert_eq!(snapshot.sessions["s"].status, SessionStatus::Idle);
}

#[test]
fn load_skips_malformed_session_records() {
    let value = serde_json::json!({
        "sessions": {
            "ok": {"path": "/p"},
            "no path": {"path": "/p"},
            "empty-path": {"path": ""},
            "not-an-object": 3,
        }
    });
    let snapshot = StateSnapshot::from_document(&value, &test_paths());
    assert_eq!(snapshot.sessions.len(), 1);
    assert!(snapshot.sessions.contains_key("ok"));
}

#[test]
fn load_accepts_legacy_field_spellings() {
    let value = serde_json::json!({
        "sessions": {"s": {
            "path": "/p",
            "session_id": "0a1b2c3d-4e5f-6789-abcd-ef0123456789",
            "model_reasoning_effort": "low",
        }}
    });
    let snapshot = StateSnapshot::from_document(&value, &test_paths());
    let rec = &snapshot.sessions["s"];
    assert_eq!(
        rec.thread_id.as_deref(),
        Some("0a1b2c3d-4e5f-6789-abcd-ef0123456789")
    );
    assert_eq!(rec.reasoning_effort, ReasoningEffort::Low);
}

#[test]
fn load_ignores_unknown_fields_and_bad_panel_entries() {
    let value = serde_json::json!({
        "unknown_top": true,
        "sessions": {"s": {"path": "/p", "surprise": {"deep": 1}}},
        "panel_by_chat": {"abc": 5, "12": "nope", "77": 9, "0": 3},
        "path_presets": ["/a", "", "/a", "/b", 42],
        "owner_id": 7,
    });
    let snapshot = StateSnapshot::from_document(&value, &test_paths());
    assert_eq!(snapshot.panel_by_chat.len(), 1);
    assert_eq!(snapshot.panel_by_chat[&77], 9);
    assert_eq!(snapshot.path_presets, vec!["/a".to_string(), "/b".to_string()]);
    assert_eq!(snapshot.owner_id, Some(7));
}

#[test]
fn load_rewrites_legacy_log_paths() {
    let paths = RuntimePaths::rooted(std::path::Path::new("/work"));
    let value = serde_json::json!({
        "sessions": {"s": {
            "path": "/p",
            "last_stdout_log": "/work/tether_logs/s_20260101_000000.jsonl",
            "last_stderr_log": "/elsewhere/s.stderr.txt",
        }}
    });
    let snapshot = StateSnapshot::from_document(&value, &paths);
    let rec = &snapshot.sessions["s"];
    assert_eq!(
        rec.last_stdout_log.as_deref(),
        Some("/work/.tether/logs/s_20260101_000000.jsonl")
    );
    assert_eq!(rec.last_stderr_log.as_deref(), Some("/elsewhere/s.stderr.txt"));
}

#[test]
fn artifact_paths_cover_recorded_logs_and_prefix_glob() {
    let tmp = tempfile::tempdir().unwrap();
    let log_dir = tmp.path();
    std::fs::write(log_dir.join("s_20260101_000000.jsonl"), "{}").unwrap();
    std::fs::write(log_dir.join("s_20260101_000000.stderr.txt"), "").unwrap();
    std::fs::write(log_dir.join("other_20260101_000000.jsonl"), "{}").unwrap();
    std::fs::write(log_dir.join("s_unrelated.bin"), "").unwrap();

    let mut rec = SessionRecord::new("s", "/p");
    rec.last_stdout_log = Some(log_dir.join("s_20260101_000000.jsonl").display().to_string());

    let artifacts = session_artifact_paths(&rec, log_dir);
    assert_eq!(artifacts.len(), 2);
    assert!(artifacts
        .iter()
        .all(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with("s_2"))));
}
