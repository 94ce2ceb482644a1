// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-directory path handling: resolution, creatability checks, and
//! display shortening.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from [`resolve_path`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty path.")]
    Empty,
    #[error("Invalid path: contains NUL byte.")]
    NulByte,
    #[error("Failed to resolve path: {0}")]
    Unresolvable(String),
}

/// Resolve user input into an absolute path.
///
/// Expands a leading `~` to `$HOME`, rejects empty input and NUL bytes, and
/// absolutizes relative paths against the current directory. The path does
/// not have to exist.
pub fn resolve_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }
    if trimmed.contains('\0') {
        return Err(PathError::NulByte);
    }

    let expanded = expand_user(trimmed);
    std::path::absolute(&expanded)
        .map_err(|e| PathError::Unresolvable(format!("{}: {}", expanded.display(), e)))
}

fn expand_user(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Best-effort check whether a not-yet-existing directory can likely be
/// created: the nearest existing ancestor must be a writable directory.
pub fn can_create_directory(path: &Path) -> bool {
    if path.exists() {
        return false;
    }

    let mut ancestor = path.parent();
    while let Some(parent) = ancestor {
        match std::fs::metadata(parent) {
            Ok(meta) => return meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => {
                if parent.parent() == Some(parent) {
                    return false;
                }
                ancestor = parent.parent();
            }
        }
    }
    false
}

/// Shorten a path for button labels: keep the last two components behind an
/// ellipsis when the full path exceeds `max_len` characters.
pub fn shorten_path(path: &str, max_len: usize) -> String {
    let p = path.trim();
    if p.chars().count() <= max_len {
        return p.to_string();
    }
    let normalized = p.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').collect();
    let tail = if parts.len() >= 2 {
        parts[parts.len() - 2..].join("/")
    } else {
        parts.last().copied().unwrap_or_default().to_string()
    };
    if tail.chars().count() + 2 >= max_len {
        let keep = max_len.saturating_sub(1);
        let tail_chars: Vec<char> = tail.chars().collect();
        let start = tail_chars.len().saturating_sub(keep);
        let clipped: String = tail_chars[start..].iter().collect();
        return format!("…{clipped}");
    }
    format!("…/{tail}")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
