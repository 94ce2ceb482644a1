// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tether_core::{ReasoningEffort, RunMode, SessionRecord};

fn record() -> SessionRecord {
    let mut rec = SessionRecord::new("s1", "/srv/app");
    rec.model = "gpt-5.2".to_string();
    rec.reasoning_effort = ReasoningEffort::High;
    rec
}

fn clear_codex_env() {
    std::env::remove_var("TETHER_CODEX_BIN");
    std::env::remove_var("TETHER_SANDBOX");
    std::env::remove_var("TETHER_APPROVAL_POLICY");
}

#[test]
#[serial]
fn new_run_outside_git_skips_repo_check() {
    clear_codex_env();
    let cmd = build_codex_cmd(&record(), "hello", RunMode::New, None);
    assert_eq!(
        cmd,
        vec![
            "codex",
            "exec",
            "--json",
            "--sandbox",
            "workspace-write",
            "-c",
            "approval_policy=never",
            "--skip-git-repo-check",
            "-C",
            "/srv/app",
            "--model",
            "gpt-5.2",
            "-c",
            "model_reasoning_effort=high",
            "hello",
        ]
    );
}

#[test]
#[serial]
fn git_dir_becomes_add_dir() {
    clear_codex_env();
    let cmd = build_codex_cmd(
        &record(),
        "hi",
        RunMode::New,
        Some(std::path::Path::new("/srv/app/.git")),
    );
    assert!(!cmd.contains(&"--skip-git-repo-check".to_string()));
    let pos = cmd.iter().position(|a| a == "--add-dir").unwrap();
    assert_eq!(cmd[pos + 1], "/srv/app/.git");
}

#[test]
#[serial]
fn continue_with_thread_id_inserts_resume_before_prompt() {
    clear_codex_env();
    let mut rec = record();
    rec.thread_id = Some("0a1b2c3d-4e5f-6789-abcd-ef0123456789".to_string());
    let cmd = build_codex_cmd(&rec, "more", RunMode::Continue, None);
    let pos = cmd.iter().position(|a| a == "resume").unwrap();
    assert_eq!(cmd[pos + 1], "0a1b2c3d-4e5f-6789-abcd-ef0123456789");
    assert_eq!(cmd.last().map(String::as_str), Some("more"));
}

#[test]
#[serial]
fn continue_without_thread_id_behaves_like_new() {
    clear_codex_env();
    let cmd = build_codex_cmd(&record(), "more", RunMode::Continue, None);
    assert!(!cmd.contains(&"resume".to_string()));
}

#[test]
#[serial]
fn new_run_never_resumes_even_with_thread_id() {
    clear_codex_env();
    let mut rec = record();
    rec.thread_id = Some("0a1b2c3d-4e5f-6789-abcd-ef0123456789".to_string());
    let cmd = build_codex_cmd(&rec, "fresh", RunMode::New, None);
    assert!(!cmd.contains(&"resume".to_string()));
}

#[test]
#[serial]
fn dash_prefixed_prompt_gets_end_of_options_marker() {
    clear_codex_env();
    let cmd = build_codex_cmd(&record(), "-rf /", RunMode::New, None);
    let len = cmd.len();
    assert_eq!(cmd[len - 2], "--");
    assert_eq!(cmd[len - 1], "-rf /");

    let cmd = build_codex_cmd(&record(), "  --help", RunMode::New, None);
    assert_eq!(cmd[cmd.len() - 2], "--");
}

#[test]
#[serial]
fn env_overrides_flow_into_the_command() {
    clear_codex_env();
    std::env::set_var("TETHER_CODEX_BIN", "/usr/local/bin/codex");
    std::env::set_var("TETHER_SANDBOX", "danger-full-access");
    std::env::set_var("TETHER_APPROVAL_POLICY", "on-request");
    let cmd = build_codex_cmd(&record(), "x", RunMode::New, None);
    clear_codex_env();

    assert_eq!(cmd[0], "/usr/local/bin/codex");
    assert!(cmd.contains(&"danger-full-access".to_string()));
    assert!(cmd.contains(&"approval_policy=on-request".to_string()));
}

#[test]
#[serial]
fn preset_discovery_reads_codex_config() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("config.toml"),
        r#"
model = "gpt-5.1-codex-mini"

[notice.model_migrations]
"gpt-5.1-codex-mini" = "gpt-5.2-codex"
"#,
    )
    .unwrap();
    std::env::set_var("CODEX_HOME", tmp.path());
    let presets = discover_model_presets();
    std::env::remove_var("CODEX_HOME");

    // Config model first, then its migration target, then remaining defaults.
    assert_eq!(presets[0], "gpt-5.1-codex-mini");
    assert_eq!(presets[1], "gpt-5.2-codex");
    assert!(presets.contains(&"gpt-5.2".to_string()));
    let unique: std::collections::HashSet<_> = presets.iter().collect();
    assert_eq!(unique.len(), presets.len());
}

#[test]
#[serial]
fn preset_discovery_ignores_models_outside_the_allowlist() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "model = \"o99-custom\"\n").unwrap();
    std::env::set_var("CODEX_HOME", tmp.path());
    let presets = discover_model_presets();
    std::env::remove_var("CODEX_HOME");

    assert!(!presets.contains(&"o99-custom".to_string()));
    assert_eq!(presets.len(), tether_core::DEFAULT_MODEL_PRESETS.len());
}

#[test]
#[serial]
fn preset_discovery_survives_missing_config() {
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("CODEX_HOME", tmp.path().join("nope"));
    let presets = discover_model_presets();
    std::env::remove_var("CODEX_HOME");
    assert_eq!(
        presets,
        tether_core::DEFAULT_MODEL_PRESETS
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
    );
}
