// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent CLI command building and model preset discovery.

use std::path::{Path, PathBuf};

use tether_core::{RunMode, SessionRecord, DEFAULT_MODEL_PRESETS};

/// Sandbox modes understood by `codex exec --sandbox`.
pub const SANDBOX_MODES: &[&str] = &["read-only", "workspace-write", "danger-full-access"];

/// Approval policies understood by `codex exec -c approval_policy=...`.
pub const APPROVAL_POLICIES: &[&str] = &["untrusted", "on-failure", "on-request", "never"];

/// Build the full argv for one run.
///
/// `git_dir` is the resolved git directory for the session path, if any;
/// without one the repo check is skipped so codex still starts outside Git.
/// Prompts that begin with `-` are preceded by `--` so they are not taken
/// for options.
pub fn build_codex_cmd(
    rec: &SessionRecord,
    prompt: &str,
    run_mode: RunMode,
    git_dir: Option<&Path>,
) -> Vec<String> {
    let mut cmd = vec![
        crate::env::codex_bin(),
        "exec".to_string(),
        "--json".to_string(),
        "--sandbox".to_string(),
        crate::env::sandbox_mode(),
        "-c".to_string(),
        format!("approval_policy={}", crate::env::approval_policy()),
    ];

    match git_dir {
        Some(dir) => {
            cmd.push("--add-dir".to_string());
            cmd.push(dir.display().to_string());
        }
        None => cmd.push("--skip-git-repo-check".to_string()),
    }

    cmd.push("-C".to_string());
    cmd.push(rec.path.clone());
    cmd.push("--model".to_string());
    cmd.push(rec.model.clone());
    cmd.push("-c".to_string());
    cmd.push(format!("model_reasoning_effort={}", rec.reasoning_effort));

    if run_mode == RunMode::Continue {
        if let Some(thread_id) = &rec.thread_id {
            cmd.push("resume".to_string());
            cmd.push(thread_id.clone());
        }
    }

    if prompt.trim_start().starts_with('-') {
        cmd.push("--".to_string());
    }
    cmd.push(prompt.to_string());
    cmd
}

fn codex_home() -> PathBuf {
    if let Ok(home) = std::env::var("CODEX_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    let home = std::env::var("HOME").unwrap_or_default();
    Path::new(&home).join(".codex")
}

/// Discover model presets for the settings screen.
///
/// Reads the user's Codex `config.toml` (`model`, plus the migration target
/// under `notice.model_migrations`), keeps only values from the built-in
/// allowlist, and appends the built-in defaults. Order is preserved, first
/// occurrence wins.
pub fn discover_model_presets() -> Vec<String> {
    let mut presets: Vec<String> = Vec::new();
    let mut add = |val: &str| {
        let s = val.trim();
        if s.is_empty() || presets.iter().any(|p| p == s) {
            return;
        }
        if !DEFAULT_MODEL_PRESETS.contains(&s) {
            return;
        }
        presets.push(s.to_string());
    };

    if let Some(config) = read_codex_config() {
        let model = config.get("model").and_then(toml::Value::as_str);
        if let Some(model) = model {
            add(model);
            if let Some(migrated) = config
                .get("notice")
                .and_then(|n| n.get("model_migrations"))
                .and_then(|m| m.get(model))
                .and_then(toml::Value::as_str)
            {
                add(migrated);
            }
        }
    }

    for preset in DEFAULT_MODEL_PRESETS {
        add(preset);
    }
    presets
}

fn read_codex_config() -> Option<toml::Value> {
    let raw = std::fs::read_to_string(codex_home().join("config.toml")).ok()?;
    toml::from_str(&raw).ok()
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
