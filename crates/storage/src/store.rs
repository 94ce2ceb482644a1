// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic persistence of the state document.
//!
//! Writes go to a temp file in the same directory followed by a rename, so
//! a crash mid-save can never leave a torn document. Saves are serialized by
//! a mutex; the on-disk file always reflects a totally ordered sequence of
//! snapshots.

use std::fs;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::paths::RuntimePaths;
use crate::state::StateSnapshot;

/// Errors that can occur when writing the state document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle to the on-disk state document.
#[derive(Clone)]
pub struct StateStore {
    paths: RuntimePaths,
    write_lock: Arc<Mutex<()>>,
}

impl StateStore {
    pub fn new(paths: RuntimePaths) -> Self {
        Self {
            paths,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    /// Save the snapshot atomically (write temp file, then rename).
    pub fn save(&self, snapshot: &StateSnapshot) -> Result<(), StoreError> {
        let json = snapshot.to_document_json()?;

        let _guard = self.write_lock.lock();
        let path = &self.paths.state_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Save and log instead of propagating — the in-memory state stays
    /// authoritative until the next successful save.
    pub fn save_logged(&self, snapshot: &StateSnapshot) {
        if let Err(e) = self.save(snapshot) {
            warn!(
                path = %self.paths.state_path.display(),
                error = %e,
                "failed to save state; continuing with in-memory state",
            );
        }
    }

    /// Load the snapshot. Any read or parse failure yields an empty snapshot
    /// (treated as a fresh install).
    pub fn load(&self) -> StateSnapshot {
        let raw = match fs::read_to_string(&self.paths.state_path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(
                        path = %self.paths.state_path.display(),
                        error = %e,
                        "failed to read state; starting fresh",
                    );
                }
                return StateSnapshot::default();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) if value.is_object() => StateSnapshot::from_document(&value, &self.paths),
            Ok(_) => StateSnapshot::default(),
            Err(e) => {
                warn!(
                    path = %self.paths.state_path.display(),
                    error = %e,
                    "state document unparseable; starting fresh",
                );
                StateSnapshot::default()
            }
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
