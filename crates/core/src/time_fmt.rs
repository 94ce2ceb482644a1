// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared timestamp and duration formatting.

use chrono::Utc;

/// Current UTC time as ISO-8601 (what the state document stores).
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Compact UTC stamp used in per-run log filenames: `yyyymmdd_HHMMSS`.
pub fn log_stamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Format seconds as `"{m}m {s}s"` — the working-timer footer format.
pub fn format_duration(seconds: u64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
