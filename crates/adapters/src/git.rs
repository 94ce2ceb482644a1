// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git directory detection for run working directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

/// Timeout for the `git rev-parse` fallback.
const GIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort: absolute path of the git directory governing `path`.
///
/// Covers a repo root with `.git/`, worktrees and submodules whose `.git` is
/// a file pointing at `gitdir: ...`, and nested paths inside a repo via
/// `git rev-parse --git-dir`. `None` means "not a repository" as far as we
/// can tell.
pub async fn detect_git_dir(path: &Path) -> Option<PathBuf> {
    let candidate = path.join(".git");

    if candidate.is_dir() {
        return absolutize(&candidate, path);
    }

    if candidate.is_file() {
        if let Ok(raw) = tokio::fs::read_to_string(&candidate).await {
            let trimmed = raw.trim();
            if let Some(rest) = trimmed
                .strip_prefix("gitdir:")
                .or_else(|| trimmed.strip_prefix("GITDIR:"))
            {
                let gitdir = rest.trim();
                if !gitdir.is_empty() {
                    let resolved = absolutize(Path::new(gitdir), path)?;
                    if resolved.exists() {
                        return Some(resolved);
                    }
                }
            }
        }
    }

    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(path).arg("rev-parse").arg("--git-dir");
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::null());
    cmd.stdin(std::process::Stdio::null());

    let output = match tokio::time::timeout(GIT_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => output,
        _ => return None,
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let gitdir = stdout.trim();
    if gitdir.is_empty() {
        return None;
    }
    absolutize(Path::new(gitdir), path)
}

/// Make `p` absolute, resolving relative paths against `base`.
fn absolutize(p: &Path, base: &Path) -> Option<PathBuf> {
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    };
    joined.canonicalize().ok().or(Some(joined))
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
