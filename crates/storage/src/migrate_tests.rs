// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

#[test]
fn rewrite_moves_paths_under_the_current_log_dir() {
    let rewritten = rewrite_legacy_log_path(
        "/work/tether_logs/s_1.jsonl",
        Some(Path::new("/work/tether_logs")),
        Path::new("/work/.tether/logs"),
    );
    assert_eq!(rewritten, "/work/.tether/logs/s_1.jsonl");
}

#[test]
fn rewrite_passes_unrelated_paths_through() {
    let rewritten = rewrite_legacy_log_path(
        "/other/place/s_1.jsonl",
        Some(Path::new("/work/tether_logs")),
        Path::new("/work/.tether/logs"),
    );
    assert_eq!(rewritten, "/other/place/s_1.jsonl");

    let untouched =
        rewrite_legacy_log_path("/any/s_1.jsonl", None, Path::new("/work/.tether/logs"));
    assert_eq!(untouched, "/any/s_1.jsonl");
}

#[test]
fn migration_moves_legacy_files_into_runtime_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();
    let paths = RuntimePaths::rooted(base);

    std::fs::create_dir_all(base.join("tether_logs")).unwrap();
    std::fs::write(base.join("tether_logs/s_1.jsonl"), "{}\n").unwrap();
    std::fs::write(base.join("tether_bot.log"), "old log\n").unwrap();
    let legacy_doc = serde_json::json!({
        "version": 3,
        "sessions": {"s": {
            "path": "/p",
            "last_stdout_log": base.join("tether_logs/s_1.jsonl").display().to_string(),
        }},
    });
    std::fs::write(
        base.join("tether_state.json"),
        serde_json::to_string(&legacy_doc).unwrap(),
    )
    .unwrap();

    maybe_migrate_runtime_files(&paths);

    assert!(paths.state_path.exists());
    assert!(paths.log_dir.join("s_1.jsonl").exists());
    assert!(paths.bot_log_path.exists());
    assert!(!base.join("tether_state.json").exists());
    assert!(!base.join("tether_logs").exists());

    let migrated: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.state_path).unwrap()).unwrap();
    let stdout_log = migrated["sessions"]["s"]["last_stdout_log"].as_str().unwrap();
    assert_eq!(
        stdout_log,
        paths.log_dir.join("s_1.jsonl").display().to_string()
    );
}

#[test]
fn migration_does_not_clobber_existing_runtime_files() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();
    let paths = RuntimePaths::rooted(base);

    std::fs::create_dir_all(&paths.runtime_dir).unwrap();
    std::fs::write(&paths.state_path, "{\"version\": 4}").unwrap();
    std::fs::write(base.join("tether_state.json"), "{\"version\": 3}").unwrap();

    maybe_migrate_runtime_files(&paths);

    let kept = std::fs::read_to_string(&paths.state_path).unwrap();
    assert!(kept.contains("4"));
    assert!(base.join("tether_state.json").exists());
}

#[test]
fn migration_is_a_noop_for_isolated_layouts() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::isolated(tmp.path());
    maybe_migrate_runtime_files(&paths);
    assert!(!paths.state_path.exists());
}
