// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use tether_adapters::RecordingTransport;
use tether_storage::{RuntimePaths, StateStore};

fn registry_in(dir: &std::path::Path, admin_id: Option<i64>) -> (Registry, RecordingTransport) {
    let transport = RecordingTransport::new();
    let store = StateStore::new(RuntimePaths::isolated(dir));
    (
        Registry::new(store, Arc::new(transport.clone()), admin_id),
        transport,
    )
}

#[tokio::test]
async fn create_validates_name_and_path() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(&tmp.path().join("rt"), None);

    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();

    let rec = registry
        .create_session("s1", &work.display().to_string())
        .await
        .unwrap();
    assert_eq!(rec.name, "s1");
    assert_eq!(rec.path, work.display().to_string());

    assert!(matches!(
        registry.create_session("bad name", &work.display().to_string()).await,
        Err(RegistryError::InvalidName)
    ));
    assert!(matches!(
        registry.create_session("s1", &work.display().to_string()).await,
        Err(RegistryError::Duplicate)
    ));
    assert!(matches!(
        registry
            .create_session("s2", &tmp.path().join("nope").display().to_string())
            .await,
        Err(RegistryError::DirectoryNotFound(_))
    ));
    assert!(matches!(
        registry.create_session("s3", "").await,
        Err(RegistryError::Path(_))
    ));
}

#[tokio::test]
async fn created_sessions_survive_a_reload() {
    let tmp = tempfile::tempdir().unwrap();
    let rt = tmp.path().join("rt");
    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();

    {
        let (registry, _) = registry_in(&rt, None);
        registry
            .create_session("persists", &work.display().to_string())
            .await
            .unwrap();
    }

    let (registry, _) = registry_in(&rt, None);
    assert!(registry.has_session("persists"));
}

#[tokio::test]
async fn delete_without_run_removes_session_and_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let rt = tmp.path().join("rt");
    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    let (registry, _) = registry_in(&rt, None);

    registry
        .create_session("gone", &work.display().to_string())
        .await
        .unwrap();

    let log_dir = registry.paths().log_dir;
    std::fs::create_dir_all(&log_dir).unwrap();
    let log_file = log_dir.join("gone_20260101_000000.jsonl");
    std::fs::write(&log_file, "{}\n").unwrap();

    let outcome = registry.delete_session("gone").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(!registry.has_session("gone"));
    assert!(!log_file.exists());

    assert!(matches!(
        registry.delete_session("gone").await,
        Err(RegistryError::UnknownSession(_))
    ));
}

#[tokio::test]
async fn clear_resets_the_record_and_deletes_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    let (registry, _) = registry_in(&tmp.path().join("rt"), None);

    registry
        .create_session("s", &work.display().to_string())
        .await
        .unwrap();
    registry.update_session("s", |rec| {
        rec.thread_id = Some("t".into());
        rec.status = SessionStatus::Error;
        rec.last_result = LastResult::Error;
        rec.last_run_duration_s = Some(9);
        rec.last_stdout_log = Some("/nonexistent.jsonl".into());
    });

    registry.clear_session("s").await.unwrap();
    let rec = registry.session("s").unwrap();
    assert!(rec.never_ran());
    assert_eq!(rec.status, SessionStatus::Idle);
    assert_eq!(rec.last_result, LastResult::Never);
}

#[tokio::test]
async fn stop_without_a_run_reports_false() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(tmp.path(), None);
    assert!(!registry.stop("missing").await);
}

#[tokio::test]
async fn auto_names_skip_taken_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    let (registry, _) = registry_in(&tmp.path().join("rt"), None);

    assert_eq!(registry.next_auto_session_name(), "session-1");
    registry
        .create_session("session-1", &work.display().to_string())
        .await
        .unwrap();
    assert_eq!(registry.next_auto_session_name(), "session-2");
}

#[tokio::test]
async fn owner_capture_and_admin_gating() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(&tmp.path().join("a"), None);
    assert!(registry.ensure_owner(10).await);
    assert!(registry.ensure_owner(10).await);
    assert!(!registry.ensure_owner(11).await);
    assert_eq!(registry.owner_id(), Some(10));

    let (admin_registry, _) = registry_in(&tmp.path().join("b"), Some(42));
    assert!(admin_registry.ensure_owner(42).await);
    assert!(!admin_registry.ensure_owner(10).await);
    // Admin mode never captures an owner.
    assert_eq!(admin_registry.owner_id(), None);
}

#[tokio::test]
async fn path_presets_dedupe_and_delete_by_index() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(tmp.path(), None);

    registry.upsert_path_preset("/a").await;
    registry.upsert_path_preset("/b").await;
    registry.upsert_path_preset("/a").await;
    registry.upsert_path_preset("  ").await;
    assert_eq!(registry.path_presets(), vec!["/a".to_string(), "/b".to_string()]);

    assert!(registry.delete_path_preset(0).await);
    assert!(!registry.delete_path_preset(5).await);
    assert_eq!(registry.path_presets(), vec!["/b".to_string()]);
}

#[tokio::test]
async fn panel_bindings_round_trip_and_drop() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(tmp.path(), None);

    assert_eq!(registry.panel_message_id(1), None);
    registry.set_panel_message_id(1, 77).await;
    assert_eq!(registry.panel_message_id(1), Some(77));

    assert_eq!(registry.drop_panel_binding(1), Some(77));
    assert_eq!(registry.panel_message_id(1), None);
    registry.restore_panel_binding(1, 77);
    assert_eq!(registry.panel_message_id(1), Some(77));
}

#[tokio::test]
async fn attach_map_registration_and_resolution() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(tmp.path(), None);

    registry.register_run_message(1, 2, "s");
    assert_eq!(
        registry.resolve_session_for_run_message(1, 2).as_deref(),
        Some("s")
    );
    // Zero ids are ignored.
    registry.register_run_message(0, 2, "x");
    assert_eq!(registry.resolve_session_for_run_message(0, 2), None);

    registry.unregister_run_message(1, 2);
    assert_eq!(registry.resolve_session_for_run_message(1, 2), None);
}

#[tokio::test]
async fn no_attached_running_session_without_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let (registry, _) = registry_in(tmp.path(), None);
    assert_eq!(registry.resolve_attached_running_session(1, 2), None);
    assert!(!registry.has_running_in_chat(1));
    assert!(!registry.is_running("anything"));
}
