// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort migration from the legacy flat-file layout into the runtime
//! directory, performed once at process start. Every step tolerates failure;
//! a half-migrated install still works because log paths are also rewritten
//! at load time.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::paths::RuntimePaths;

/// Rewrite a log path recorded under the legacy log dir to the current one.
/// Anything outside the legacy dir passes through untouched.
pub fn rewrite_legacy_log_path(
    path_str: &str,
    legacy_log_dir: Option<&Path>,
    log_dir: &Path,
) -> String {
    let Some(legacy) = legacy_log_dir else {
        return path_str.to_string();
    };
    let path = Path::new(path_str);
    let mut candidates = vec![legacy.to_path_buf()];
    if let Ok(abs) = std::path::absolute(legacy) {
        candidates.push(abs);
    }
    for base in candidates {
        if let Ok(rel) = path.strip_prefix(&base) {
            return log_dir.join(rel).display().to_string();
        }
    }
    path_str.to_string()
}

/// Rewrite all session log paths inside a raw legacy document. Returns
/// whether anything changed.
fn rewrite_state_paths(raw: &mut Value, legacy_log_dir: Option<&Path>, log_dir: &Path) -> bool {
    let Some(sessions) = raw.get_mut("sessions").and_then(Value::as_object_mut) else {
        return false;
    };

    let mut changed = false;
    for payload in sessions.values_mut() {
        let Some(map) = payload.as_object_mut() else {
            continue;
        };
        for key in ["last_stdout_log", "last_stderr_log"] {
            let Some(val) = map.get(key).and_then(Value::as_str) else {
                continue;
            };
            let rewritten = rewrite_legacy_log_path(val, legacy_log_dir, log_dir);
            if rewritten != val {
                map.insert(key.to_string(), Value::String(rewritten));
                changed = true;
            }
        }
    }
    changed
}

/// Move legacy runtime files under the runtime directory.
///
/// No-op when the paths carry no legacy locations (env override or tests),
/// or when the new locations already exist.
pub fn maybe_migrate_runtime_files(paths: &RuntimePaths) {
    let (Some(legacy_state), Some(legacy_logs), Some(legacy_bot_log)) = (
        paths.legacy_state_path.as_deref(),
        paths.legacy_log_dir.as_deref(),
        paths.legacy_bot_log_path.as_deref(),
    ) else {
        return;
    };

    if std::fs::create_dir_all(&paths.runtime_dir).is_err() {
        return;
    }

    if legacy_bot_log.exists() && !paths.bot_log_path.exists() {
        let _ = std::fs::rename(legacy_bot_log, &paths.bot_log_path);
    }

    if legacy_logs.exists() && !paths.log_dir.exists() {
        let _ = std::fs::rename(legacy_logs, &paths.log_dir);
    }

    if legacy_state.exists() && !paths.state_path.exists() {
        let Ok(raw) = std::fs::read_to_string(legacy_state) else {
            return;
        };
        let Ok(mut value) = serde_json::from_str::<Value>(&raw) else {
            return;
        };
        if !value.is_object() {
            return;
        }

        info!(
            from = %legacy_state.display(),
            to = %paths.state_path.display(),
            "migrating legacy state document",
        );

        if rewrite_state_paths(&mut value, paths.legacy_log_dir.as_deref(), &paths.log_dir) {
            let Ok(json) = serde_json::to_string_pretty(&value) else {
                return;
            };
            let tmp = paths.state_path.with_extension("json.tmp");
            if std::fs::write(&tmp, json).is_ok()
                && std::fs::rename(&tmp, &paths.state_path).is_ok()
            {
                let _ = std::fs::remove_file(legacy_state);
            }
        } else {
            let _ = std::fs::rename(legacy_state, &paths.state_path);
        }
    }
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
