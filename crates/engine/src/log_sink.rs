// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-run log files.
//!
//! A sink opens its file lazily and keeps writing through transient
//! filesystem trouble: a failed open is retried no more than once every five
//! seconds, a failed write closes the handle so the next write re-opens.
//! Log I/O never propagates into the run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::warn;

/// Minimum interval between open attempts after a failure.
const REOPEN_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Best-effort append sink for one log file.
pub struct LogSink {
    path: PathBuf,
    file: Option<File>,
    last_open_attempt: Option<Instant>,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            last_open_attempt: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_open(&mut self) -> bool {
        if self.file.is_some() {
            return true;
        }
        if let Some(last) = self.last_open_attempt {
            if last.elapsed() < REOPEN_BACKOFF {
                return false;
            }
        }
        self.last_open_attempt = Some(Instant::now());

        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %self.path.display(), error = %e, "failed to create log dir");
                return false;
            }
        }
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => {
                self.file = Some(file);
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to open log file");
                false
            }
        }
    }

    /// Append one decoded chunk (normally a full line including `\n`).
    pub fn write_chunk(&mut self, chunk: &str) {
        if !self.try_open() {
            return;
        }
        let failed = match self.file.as_mut() {
            Some(file) => {
                let result = file.write_all(chunk.as_bytes()).and_then(|()| file.flush());
                if let Err(e) = &result {
                    warn!(path = %self.path.display(), error = %e, "failed to write log file");
                }
                result.is_err()
            }
            None => false,
        };
        if failed {
            // Drop the handle; the next write attempts a fresh open.
            self.file = None;
        }
    }
}

#[cfg(test)]
#[path = "log_sink_tests.rs"]
mod tests;
