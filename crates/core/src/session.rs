// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session records and the enums persisted with them.

use serde::{Deserialize, Serialize};

/// Model used when a session has no explicit choice.
pub const DEFAULT_MODEL: &str = "gpt-5.2";

/// Built-in model preset allowlist.
///
/// Kept short on purpose; preset discovery reads the user's Codex config and
/// only surfaces models from this list plus whatever that config names.
pub const DEFAULT_MODEL_PRESETS: &[&str] = &[
    "gpt-5.2-codex",
    "gpt-5.1-codex-max",
    "gpt-5.1-codex-mini",
    "gpt-5.2",
];

/// Reasoning effort used when a session has no explicit choice.
pub const DEFAULT_REASONING_EFFORT: ReasoningEffort = ReasoningEffort::High;

/// Coarse session state derived from the last completed run and the presence
/// of an active one. Persisted as `idle` whenever it reads `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
    Error,
    Stopped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Error => "error",
            SessionStatus::Stopped => "stopped",
        }
    }

    /// Parse a persisted status string, tolerating anything unknown as idle.
    pub fn parse_lenient(raw: &str) -> SessionStatus {
        match raw {
            "running" => SessionStatus::Running,
            "error" => SessionStatus::Error,
            "stopped" => SessionStatus::Stopped,
            _ => SessionStatus::Idle,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent resolved run. Sticky across idle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastResult {
    Never,
    Success,
    Error,
    Stopped,
}

impl LastResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            LastResult::Never => "never",
            LastResult::Success => "success",
            LastResult::Error => "error",
            LastResult::Stopped => "stopped",
        }
    }

    pub fn parse_lenient(raw: &str) -> LastResult {
        match raw {
            "success" => LastResult::Success,
            "error" => LastResult::Error,
            "stopped" => LastResult::Stopped,
            _ => LastResult::Never,
        }
    }
}

impl std::fmt::Display for LastResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning effort forwarded to the agent CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
    Xhigh,
}

impl ReasoningEffort {
    pub const ALL: &'static [ReasoningEffort] = &[
        ReasoningEffort::Low,
        ReasoningEffort::Medium,
        ReasoningEffort::High,
        ReasoningEffort::Xhigh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
            ReasoningEffort::Xhigh => "xhigh",
        }
    }

    pub fn parse(raw: &str) -> Option<ReasoningEffort> {
        match raw {
            "low" => Some(ReasoningEffort::Low),
            "medium" => Some(ReasoningEffort::Medium),
            "high" => Some(ReasoningEffort::High),
            "xhigh" => Some(ReasoningEffort::Xhigh),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a run starts a fresh thread or resumes the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    New,
    Continue,
}

impl RunMode {
    /// Parse a loosely-typed mode string, defaulting to `New`.
    pub fn parse_lenient(raw: &str) -> RunMode {
        if raw == "continue" {
            RunMode::Continue
        } else {
            RunMode::New
        }
    }
}

/// A named, persistent work context bound to a working directory.
///
/// The active run handle is deliberately not part of this record; the
/// registry links records to runs by name so the persisted shape stays free
/// of process state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub name: String,
    /// Absolute working directory.
    pub path: String,
    /// Continuation token returned by the agent; cleared on `new` runs.
    pub thread_id: Option<String>,
    pub model: String,
    pub reasoning_effort: ReasoningEffort,
    pub status: SessionStatus,
    pub last_result: LastResult,
    /// ISO-8601 UTC.
    pub created_at: String,
    pub last_active: Option<String>,
    pub last_stdout_log: Option<String>,
    pub last_stderr_log: Option<String>,
    pub last_run_duration_s: Option<u64>,
    /// Deletion requested while a run was active; honored when it resolves.
    pub pending_delete: bool,
}

impl SessionRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            thread_id: None,
            model: DEFAULT_MODEL.to_string(),
            reasoning_effort: DEFAULT_REASONING_EFFORT,
            status: SessionStatus::Idle,
            last_result: LastResult::Never,
            created_at: crate::time_fmt::now_iso(),
            last_active: None,
            last_stdout_log: None,
            last_stderr_log: None,
            last_run_duration_s: None,
            pending_delete: false,
        }
    }

    /// A session that has never run carries no artifacts at all.
    pub fn never_ran(&self) -> bool {
        self.last_result == LastResult::Never
            && self.thread_id.is_none()
            && self.last_stdout_log.is_none()
            && self.last_stderr_log.is_none()
            && self.last_run_duration_s.is_none()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
