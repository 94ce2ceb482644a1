// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use crate::codex::{APPROVAL_POLICIES, SANDBOX_MODES};

/// Truthy env flag: `1`, `true`, `yes`, `y`, `on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "y" | "on"
            )
        })
        .unwrap_or(false)
}

/// Agent binary, overridable via `TETHER_CODEX_BIN` (default: `codex`).
pub fn codex_bin() -> String {
    std::env::var("TETHER_CODEX_BIN")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "codex".to_string())
}

/// Sandbox mode override via `TETHER_SANDBOX`; unknown values fall back to
/// `workspace-write`.
pub fn sandbox_mode() -> String {
    let raw = std::env::var("TETHER_SANDBOX").unwrap_or_default();
    let trimmed = raw.trim();
    if SANDBOX_MODES.contains(&trimmed) {
        trimmed.to_string()
    } else {
        "workspace-write".to_string()
    }
}

/// Approval policy override via `TETHER_APPROVAL_POLICY`; unknown values
/// fall back to `never`.
pub fn approval_policy() -> String {
    let raw = std::env::var("TETHER_APPROVAL_POLICY").unwrap_or_default();
    let trimmed = raw.trim();
    if APPROVAL_POLICIES.contains(&trimmed) {
        trimmed.to_string()
    } else {
        "never".to_string()
    }
}

/// Attachment size ceiling from `TETHER_MAX_ATTACHMENT_MB`, in bytes.
pub fn max_attachment_bytes() -> Option<u64> {
    let raw = std::env::var("TETHER_MAX_ATTACHMENT_MB").ok()?;
    let mb: u64 = raw.trim().parse().ok()?;
    if mb == 0 {
        return None;
    }
    Some(mb * 1024 * 1024)
}

/// Whether user messages in group/supergroup chats may be deleted.
pub fn delete_messages_in_groups() -> bool {
    env_flag("TETHER_DELETE_MESSAGES_IN_GROUPS")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
