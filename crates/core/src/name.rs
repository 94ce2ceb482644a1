// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session name validation.

/// Maximum session name length.
pub const MAX_SESSION_NAME_LEN: usize = 64;

/// Validate and normalize a session name.
///
/// Accepts `[A-Za-z0-9._-]{1,64}` after trimming surrounding whitespace.
/// Returns `None` for anything else.
pub fn safe_session_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() || name.len() > MAX_SESSION_NAME_LEN {
        return None;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
