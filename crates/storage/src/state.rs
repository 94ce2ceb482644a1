// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persistent state document.
//!
//! Saving serializes a typed document; loading goes through a tolerant
//! [`serde_json::Value`] pass instead so unknown fields are ignored and
//! malformed records are skipped rather than failing the whole file.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tether_core::{
    safe_session_name, LastResult, ReasoningEffort, SessionRecord, SessionStatus, DEFAULT_MODEL,
};

use crate::migrate::rewrite_legacy_log_path;
use crate::paths::RuntimePaths;

/// Schema marker written into every document.
pub const STATE_VERSION: u32 = 4;

/// The persistent portion of the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub owner_id: Option<i64>,
    pub sessions: HashMap<String, SessionRecord>,
    pub panel_by_chat: HashMap<i64, i64>,
    pub path_presets: Vec<String>,
}

#[derive(Serialize)]
struct SessionOut<'a> {
    path: &'a str,
    thread_id: &'a Option<String>,
    model: &'a str,
    reasoning_effort: ReasoningEffort,
    status: SessionStatus,
    last_result: LastResult,
    created_at: &'a str,
    last_active: &'a Option<String>,
    last_stdout_log: &'a Option<String>,
    last_stderr_log: &'a Option<String>,
    last_run_duration_s: Option<u64>,
    pending_delete: bool,
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    version: u32,
    owner_id: Option<i64>,
    sessions: BTreeMap<&'a str, SessionOut<'a>>,
    panel_by_chat: BTreeMap<String, i64>,
    path_presets: &'a [String],
}

impl StateSnapshot {
    /// Serialize to the on-disk JSON shape. Sessions observed as running are
    /// persisted as idle — runs never survive the process.
    pub fn to_document_json(&self) -> Result<String, serde_json::Error> {
        let sessions: BTreeMap<&str, SessionOut<'_>> = self
            .sessions
            .iter()
            .map(|(name, rec)| {
                let status = if rec.status == SessionStatus::Running {
                    SessionStatus::Idle
                } else {
                    rec.status
                };
                (
                    name.as_str(),
                    SessionOut {
                        path: &rec.path,
                        thread_id: &rec.thread_id,
                        model: &rec.model,
                        reasoning_effort: rec.reasoning_effort,
                        status,
                        last_result: rec.last_result,
                        created_at: &rec.created_at,
                        last_active: &rec.last_active,
                        last_stdout_log: &rec.last_stdout_log,
                        last_stderr_log: &rec.last_stderr_log,
                        last_run_duration_s: rec.last_run_duration_s,
                        pending_delete: rec.pending_delete,
                    },
                )
            })
            .collect();

        let doc = DocumentOut {
            version: STATE_VERSION,
            owner_id: self.owner_id,
            sessions,
            panel_by_chat: self
                .panel_by_chat
                .iter()
                .map(|(chat, msg)| (chat.to_string(), *msg))
                .collect(),
            path_presets: &self.path_presets,
        };
        serde_json::to_string_pretty(&doc)
    }

    /// Rebuild a snapshot from a parsed document, healing `running` statuses
    /// to `idle` and rewriting log paths that still point at the legacy
    /// runtime directory.
    pub fn from_document(raw: &Value, paths: &RuntimePaths) -> StateSnapshot {
        let mut snapshot = StateSnapshot::default();

        if let Some(sessions) = raw.get("sessions").and_then(Value::as_object) {
            for (name, payload) in sessions {
                if let Some(rec) = parse_session(name, payload, paths) {
                    snapshot.sessions.insert(rec.name.clone(), rec);
                }
            }
        }

        if let Some(panel) = raw.get("panel_by_chat").and_then(Value::as_object) {
            for (chat_str, msg) in panel {
                let (Ok(chat_id), Some(message_id)) = (chat_str.parse::<i64>(), msg.as_i64())
                else {
                    continue;
                };
                if chat_id != 0 && message_id != 0 {
                    snapshot.panel_by_chat.insert(chat_id, message_id);
                }
            }
        }

        if let Some(presets) = raw.get("path_presets").and_then(Value::as_array) {
            for preset in presets {
                let Some(p) = preset.as_str() else { continue };
                let trimmed = p.trim();
                if trimmed.is_empty() || snapshot.path_presets.iter().any(|x| x == trimmed) {
                    continue;
                }
                snapshot.path_presets.push(trimmed.to_string());
            }
        }

        snapshot.owner_id = raw.get("owner_id").and_then(Value::as_i64);
        snapshot
    }
}

fn get_string(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_session(name: &str, payload: &Value, paths: &RuntimePaths) -> Option<SessionRecord> {
    if !payload.is_object() {
        return None;
    }
    let safe_name = safe_session_name(name)?;
    let path = get_string(payload, "path")?;

    let rewrite = |p: Option<String>| {
        p.map(|raw| rewrite_legacy_log_path(&raw, paths.legacy_log_dir.as_deref(), &paths.log_dir))
    };

    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .map(SessionStatus::parse_lenient)
        .unwrap_or(SessionStatus::Idle);

    Some(SessionRecord {
        name: safe_name.clone(),
        path,
        // `session_id` is the pre-v3 spelling of the continuation token.
        thread_id: get_string(payload, "thread_id").or_else(|| get_string(payload, "session_id")),
        model: get_string(payload, "model").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        reasoning_effort: payload
            .get("reasoning_effort")
            .or_else(|| payload.get("model_reasoning_effort"))
            .and_then(Value::as_str)
            .and_then(ReasoningEffort::parse)
            .unwrap_or(tether_core::DEFAULT_REASONING_EFFORT),
        status: if status == SessionStatus::Running {
            SessionStatus::Idle
        } else {
            status
        },
        last_result: payload
            .get("last_result")
            .and_then(Value::as_str)
            .map(LastResult::parse_lenient)
            .unwrap_or(LastResult::Never),
        created_at: get_string(payload, "created_at").unwrap_or_else(tether_core::now_iso),
        last_active: get_string(payload, "last_active"),
        last_stdout_log: rewrite(get_string(payload, "last_stdout_log")),
        last_stderr_log: rewrite(get_string(payload, "last_stderr_log")),
        last_run_duration_s: payload.get("last_run_duration_s").and_then(Value::as_u64),
        pending_delete: payload
            .get("pending_delete")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

/// Paths of the artifacts a session owns: the recorded log files plus the
/// session-prefix glob under the log dir.
pub fn session_artifact_paths(rec: &SessionRecord, log_dir: &Path) -> Vec<std::path::PathBuf> {
    let mut seen: Vec<std::path::PathBuf> = Vec::new();
    let mut push = |p: std::path::PathBuf| {
        if !seen.contains(&p) {
            seen.push(p);
        }
    };

    if let Some(p) = &rec.last_stdout_log {
        push(p.into());
    }
    if let Some(p) = &rec.last_stderr_log {
        push(p.into());
    }

    let prefix = format!("{}_", rec.name);
    if let Ok(entries) = std::fs::read_dir(log_dir) {
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix)
                && (name.ends_with(".jsonl") || name.ends_with(".stderr.txt"))
            {
                push(entry.path());
            }
        }
    }
    seen
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
