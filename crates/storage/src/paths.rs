// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime file locations.
//!
//! Everything tether writes lives under one runtime directory (default
//! `./.tether`). The struct is passed to constructors explicitly so several
//! instances can coexist in tests; there are no module-level path globals.

use std::path::{Path, PathBuf};

/// Environment override for the runtime directory.
pub const RUNTIME_DIR_ENV: &str = "TETHER_RUNTIME_DIR";

/// All on-disk locations used by one bot instance.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub runtime_dir: PathBuf,
    /// The persistent state document.
    pub state_path: PathBuf,
    /// Per-run stdout/stderr logs.
    pub log_dir: PathBuf,
    /// The process log written by the tracing appender.
    pub bot_log_path: PathBuf,
    /// Pre-runtime-dir locations, present only for the default layout; the
    /// one-shot migration and legacy log path rewriting key off these.
    pub legacy_state_path: Option<PathBuf>,
    pub legacy_log_dir: Option<PathBuf>,
    pub legacy_bot_log_path: Option<PathBuf>,
}

impl RuntimePaths {
    /// Layout rooted at `base`: runtime dir `base/.tether` plus the legacy
    /// flat files next to it.
    pub fn rooted(base: &Path) -> Self {
        let runtime_dir = base.join(".tether");
        Self {
            state_path: runtime_dir.join("state.json"),
            log_dir: runtime_dir.join("logs"),
            bot_log_path: runtime_dir.join("bot.log"),
            runtime_dir,
            legacy_state_path: Some(base.join("tether_state.json")),
            legacy_log_dir: Some(base.join("tether_logs")),
            legacy_bot_log_path: Some(base.join("tether_bot.log")),
        }
    }

    /// Layout fully contained in `runtime_dir`, with no legacy locations.
    /// Used for the env override and for tests.
    pub fn isolated(runtime_dir: &Path) -> Self {
        Self {
            state_path: runtime_dir.join("state.json"),
            log_dir: runtime_dir.join("logs"),
            bot_log_path: runtime_dir.join("bot.log"),
            runtime_dir: runtime_dir.to_path_buf(),
            legacy_state_path: None,
            legacy_log_dir: None,
            legacy_bot_log_path: None,
        }
    }

    /// Resolve from the environment: `TETHER_RUNTIME_DIR` wins, otherwise
    /// the default layout under the current directory.
    pub fn from_env() -> Self {
        match std::env::var(RUNTIME_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Self::isolated(Path::new(dir.trim())),
            _ => Self::rooted(Path::new(".")),
        }
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
