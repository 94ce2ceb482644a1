// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session registry: sole owner of the session map, the run handles,
//! the attach map, and the panel bindings.
//!
//! Sessions and runs are linked by name only; the registry is the single
//! mutator of both, and every mutation of persistent fields is followed by a
//! state save. Locks are never held across await points — callers get
//! clones out and act on them.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tether_adapters::ChatTransport;
use tether_core::{
    now_iso, resolve_path, safe_session_name, LastResult, PathError, SessionRecord, SessionStatus,
};
use tether_storage::state::session_artifact_paths;
use tether_storage::{RuntimePaths, StateSnapshot, StateStore};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::stream::Stream;

/// Grace period between group-SIGTERM and group-SIGKILL.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Lines kept in the in-memory stderr ring for failure diagnostics.
pub(crate) const STDERR_TAIL_LINES: usize = 80;

/// Errors surfaced to the user from registry mutations. The display text is
/// shown verbatim as a panel notice.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid name. Allowed: a-zA-Z0-9._- (<=64).")]
    InvalidName,
    #[error("A session with this name already exists.")]
    Duplicate,
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("{0}")]
    Path(#[from] PathError),
    #[error("Unknown session: {0}")]
    UnknownSession(String),
    #[error("This session is running.")]
    SessionRunning,
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// A run was active; the session is removed once it resolves.
    StopRequested,
}

impl DeleteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "Deleted.",
            DeleteOutcome::StopRequested => {
                "Stop requested. Session will be deleted after it finishes."
            }
        }
    }
}

/// Bridge back into the UI layer for post-run panel rendering. Installed by
/// the bot at startup; the engine never renders screens itself.
#[async_trait]
pub trait PanelSync: Send + Sync {
    async fn render_session_panel(
        &self,
        chat_id: i64,
        message_id: i64,
        session_name: &str,
        notice: Option<&str>,
    );
}

/// Live state of one run. Owned by the registry, linked to its session by
/// name; carries no back-pointer.
pub struct RunHandle {
    pub stream: Arc<Stream>,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub started: Instant,
    pub(crate) pid: Option<u32>,
    stop_requested: AtomicBool,
    confirm_stop: AtomicBool,
    pub(crate) last_cmd: Mutex<Option<String>>,
    pub(crate) stderr_tail: Mutex<VecDeque<String>>,
    exit_rx: watch::Receiver<bool>,
}

impl RunHandle {
    pub(crate) fn new(
        stream: Arc<Stream>,
        stdout_log: PathBuf,
        stderr_log: PathBuf,
        started: Instant,
        pid: Option<u32>,
        exit_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            stream,
            stdout_log,
            stderr_log,
            started,
            pid,
            stop_requested: AtomicBool::new(false),
            confirm_stop: AtomicBool::new(false),
            last_cmd: Mutex::new(None),
            stderr_tail: Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)),
            exit_rx,
        }
    }

    /// Whether the child process has not exited yet.
    pub fn is_alive(&self) -> bool {
        !*self.exit_rx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.stream.is_paused()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn set_stop_requested(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// UI flag: the in-stream stop confirmation is showing.
    pub fn confirm_stop(&self) -> bool {
        self.confirm_stop.load(Ordering::SeqCst)
    }

    pub fn set_confirm_stop(&self, on: bool) {
        self.confirm_stop.store(on, Ordering::SeqCst);
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn push_stderr_line(&self, line: String) {
        let mut tail = self.stderr_tail.lock();
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    /// The last stderr lines, for failure diagnostics.
    pub fn stderr_tail_lines(&self) -> Vec<String> {
        self.stderr_tail.lock().iter().cloned().collect()
    }

    /// Wait until the child exits, up to `timeout`. Returns whether it did.
    pub async fn wait_exit(&self, timeout: Duration) -> bool {
        let mut rx = self.exit_rx.clone();
        let result = tokio::time::timeout(timeout, rx.wait_for(|exited| *exited)).await;
        result.is_ok()
    }
}

#[derive(Default)]
struct RegistryState {
    owner_id: Option<i64>,
    sessions: HashMap<String, SessionRecord>,
    runs: HashMap<String, Arc<RunHandle>>,
    attach: HashMap<(i64, i64), String>,
    panel_by_chat: HashMap<i64, i64>,
    path_presets: Vec<String>,
}

struct RegistryInner {
    admin_id: Option<i64>,
    store: StateStore,
    transport: Arc<dyn ChatTransport>,
    state: Mutex<RegistryState>,
    panel_sync: OnceLock<Arc<dyn PanelSync>>,
}

/// Shared handle to the registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Load persisted state and build the registry around it.
    pub fn new(
        store: StateStore,
        transport: Arc<dyn ChatTransport>,
        admin_id: Option<i64>,
    ) -> Registry {
        let snapshot = store.load();
        let state = RegistryState {
            owner_id: snapshot.owner_id,
            sessions: snapshot.sessions,
            runs: HashMap::new(),
            attach: HashMap::new(),
            panel_by_chat: snapshot.panel_by_chat,
            path_presets: snapshot.path_presets,
        };
        Registry {
            inner: Arc::new(RegistryInner {
                admin_id,
                store,
                transport,
                state: Mutex::new(state),
                panel_sync: OnceLock::new(),
            }),
        }
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::clone(&self.inner.transport)
    }

    pub fn paths(&self) -> RuntimePaths {
        self.inner.store.paths().clone()
    }

    pub fn admin_id(&self) -> Option<i64> {
        self.inner.admin_id
    }

    /// Install the UI bridge. Later installs are ignored.
    pub fn set_panel_sync(&self, sync: Arc<dyn PanelSync>) {
        let _ = self.inner.panel_sync.set(sync);
    }

    pub(crate) fn panel_sync(&self) -> Option<Arc<dyn PanelSync>> {
        self.inner.panel_sync.get().cloned()
    }

    fn snapshot(&self) -> StateSnapshot {
        let state = self.inner.state.lock();
        StateSnapshot {
            owner_id: state.owner_id,
            sessions: state.sessions.clone(),
            panel_by_chat: state.panel_by_chat.clone(),
            path_presets: state.path_presets.clone(),
        }
    }

    /// Persist the current state; write errors are logged, never fatal.
    pub async fn save_state(&self) {
        let snapshot = self.snapshot();
        let store = self.inner.store.clone();
        let _ = tokio::task::spawn_blocking(move || store.save_logged(&snapshot)).await;
    }

    /// Owner gating: a configured admin id is authoritative; otherwise the
    /// first user seen becomes the persisted owner.
    pub async fn ensure_owner(&self, user_id: i64) -> bool {
        if let Some(admin) = self.inner.admin_id {
            return user_id == admin;
        }
        let captured = {
            let mut state = self.inner.state.lock();
            match state.owner_id {
                None => {
                    state.owner_id = Some(user_id);
                    true
                }
                Some(owner) => return owner == user_id,
            }
        };
        if captured {
            info!(user_id, "captured first user as owner");
            self.save_state().await;
        }
        captured
    }

    pub fn owner_id(&self) -> Option<i64> {
        self.inner.state.lock().owner_id
    }

    // ---- sessions ----------------------------------------------------

    pub fn session(&self, name: &str) -> Option<SessionRecord> {
        self.inner.state.lock().sessions.get(name).cloned()
    }

    pub fn has_session(&self, name: &str) -> bool {
        self.inner.state.lock().sessions.contains_key(name)
    }

    /// All sessions, sorted by name.
    pub fn sessions_sorted(&self) -> Vec<SessionRecord> {
        let state = self.inner.state.lock();
        let mut sessions: Vec<SessionRecord> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        sessions
    }

    pub fn run(&self, name: &str) -> Option<Arc<RunHandle>> {
        self.inner.state.lock().runs.get(name).cloned()
    }

    /// status == running AND a live run object exists.
    pub fn is_running(&self, name: &str) -> bool {
        let state = self.inner.state.lock();
        let running_status = state
            .sessions
            .get(name)
            .map(|rec| rec.status == SessionStatus::Running)
            .unwrap_or(false);
        running_status
            && state
                .runs
                .get(name)
                .map(|run| run.is_alive())
                .unwrap_or(false)
    }

    /// Apply `f` to a session record. Returns false for unknown sessions.
    /// Persistence is the caller's job.
    pub(crate) fn update_session<F: FnOnce(&mut SessionRecord)>(&self, name: &str, f: F) -> bool {
        let mut state = self.inner.state.lock();
        match state.sessions.get_mut(name) {
            Some(rec) => {
                f(rec);
                true
            }
            None => false,
        }
    }

    /// Update the session's model choice.
    pub async fn set_model(&self, name: &str, model: &str) {
        let changed = self.update_session(name, |rec| rec.model = model.to_string());
        if changed {
            self.save_state().await;
        }
    }

    /// Update the session's reasoning effort.
    pub async fn set_reasoning_effort(&self, name: &str, effort: tether_core::ReasoningEffort) {
        let changed = self.update_session(name, |rec| rec.reasoning_effort = effort);
        if changed {
            self.save_state().await;
        }
    }

    /// Record a freshly discovered continuation token.
    pub async fn set_thread_id(&self, name: &str, thread_id: String) {
        let changed = self.update_session(name, |rec| {
            rec.thread_id = Some(thread_id);
            rec.last_active = Some(now_iso());
        });
        if changed {
            self.save_state().await;
        }
    }

    pub(crate) fn insert_run(&self, name: &str, run: Arc<RunHandle>) {
        self.inner.state.lock().runs.insert(name.to_string(), run);
    }

    pub(crate) fn remove_run(&self, name: &str) {
        self.inner.state.lock().runs.remove(name);
    }

    /// First free `session-N` name.
    pub fn next_auto_session_name(&self) -> String {
        let state = self.inner.state.lock();
        let mut n = 1usize;
        loop {
            let candidate = format!("session-{n}");
            if !state.sessions.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Validate and create a session. The path must resolve to an existing
    /// directory.
    pub async fn create_session(
        &self,
        name: &str,
        path_raw: &str,
    ) -> Result<SessionRecord, RegistryError> {
        let safe_name = safe_session_name(name).ok_or(RegistryError::InvalidName)?;
        let resolved = resolve_path(path_raw)?;
        if !resolved.is_dir() {
            return Err(RegistryError::DirectoryNotFound(
                resolved.display().to_string(),
            ));
        }

        let rec = {
            let mut state = self.inner.state.lock();
            if state.sessions.contains_key(&safe_name) {
                return Err(RegistryError::Duplicate);
            }
            let rec = SessionRecord::new(safe_name.clone(), resolved.display().to_string());
            state.sessions.insert(safe_name, rec.clone());
            rec
        };
        self.save_state().await;
        Ok(rec)
    }

    /// Delete a session. With an active run this only marks pending-delete
    /// and requests a stop; the runner completes the deletion.
    pub async fn delete_session(&self, name: &str) -> Result<DeleteOutcome, RegistryError> {
        let has = self.has_session(name);
        if !has {
            return Err(RegistryError::UnknownSession(name.to_string()));
        }

        if self.run(name).map(|run| run.is_alive()).unwrap_or(false) {
            self.update_session(name, |rec| rec.pending_delete = true);
            self.save_state().await;
            self.stop(name).await;
            return Ok(DeleteOutcome::StopRequested);
        }

        let removed = {
            let mut state = self.inner.state.lock();
            state.sessions.remove(name)
        };
        if let Some(rec) = removed {
            self.delete_artifacts(&rec);
        }
        self.save_state().await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Reset a session to its never-ran shape, deleting artifacts. Refused
    /// while a run is active.
    pub async fn clear_session(&self, name: &str) -> Result<(), RegistryError> {
        let rec = self
            .session(name)
            .ok_or_else(|| RegistryError::UnknownSession(name.to_string()))?;
        if self.run(name).map(|run| run.is_alive()).unwrap_or(false) {
            return Err(RegistryError::SessionRunning);
        }

        self.delete_artifacts(&rec);
        self.update_session(name, |rec| {
            rec.thread_id = None;
            rec.status = SessionStatus::Idle;
            rec.last_result = LastResult::Never;
            rec.last_active = None;
            rec.last_stdout_log = None;
            rec.last_stderr_log = None;
            rec.last_run_duration_s = None;
            rec.pending_delete = false;
        });
        self.remove_run(name);
        self.save_state().await;
        Ok(())
    }

    fn delete_artifacts(&self, rec: &SessionRecord) {
        for path in session_artifact_paths(rec, &self.paths().log_dir) {
            if path.is_file() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "failed to delete artifact");
                }
            }
        }
    }

    /// Stop a run: group-SIGTERM, five seconds of grace, group-SIGKILL.
    /// Idempotent; safe from concurrent callers. Returns false when no run
    /// exists at all.
    pub async fn stop(&self, name: &str) -> bool {
        let Some(run) = self.run(name) else {
            return false;
        };
        run.set_stop_requested();

        if !run.is_alive() {
            return true;
        }

        // Negative pid targets the whole process group.
        if let Some(pid) = run.pid {
            match kill(Pid::from_raw(-(pid as i32)), Signal::SIGTERM) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => {
                    warn!(pid, error = %e, "group SIGTERM failed");
                }
            }
        }

        if !run.wait_exit(STOP_GRACE).await {
            if let Some(pid) = run.pid {
                match kill(Pid::from_raw(-(pid as i32)), Signal::SIGKILL) {
                    Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                    Err(e) => {
                        warn!(pid, error = %e, "group SIGKILL failed");
                    }
                }
            }
        }
        true
    }

    /// Stop all active runs in parallel, then save.
    pub async fn shutdown(&self) {
        let names: Vec<String> = {
            let state = self.inner.state.lock();
            state
                .runs
                .iter()
                .filter(|(_, run)| run.is_alive())
                .map(|(name, _)| name.clone())
                .collect()
        };

        let mut tasks = Vec::new();
        for name in names {
            let registry = self.clone();
            tasks.push(tokio::spawn(async move {
                registry.stop(&name).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
        self.save_state().await;
    }

    // ---- attach map ---------------------------------------------------

    pub fn register_run_message(&self, chat_id: i64, message_id: i64, session_name: &str) {
        if chat_id == 0 || message_id == 0 || session_name.is_empty() {
            return;
        }
        self.inner
            .state
            .lock()
            .attach
            .insert((chat_id, message_id), session_name.to_string());
    }

    pub fn unregister_run_message(&self, chat_id: i64, message_id: i64) {
        self.inner.state.lock().attach.remove(&(chat_id, message_id));
    }

    pub fn resolve_session_for_run_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Option<String> {
        self.inner
            .state
            .lock()
            .attach
            .get(&(chat_id, message_id))
            .cloned()
    }

    /// Among sessions whose stream is bound to `(chat, message)`, the one
    /// whose run is alive and not paused, if any.
    pub fn resolve_attached_running_session(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Option<String> {
        let state = self.inner.state.lock();
        for (name, run) in &state.runs {
            let running = state
                .sessions
                .get(name)
                .map(|rec| rec.status == SessionStatus::Running)
                .unwrap_or(false);
            if !running || !run.is_alive() || run.is_paused() {
                continue;
            }
            if run.stream.chat_id() == chat_id && run.stream.message_id() == message_id {
                return Some(name.clone());
            }
        }
        None
    }

    /// Enforce at-most-one active writer per message: pause every other
    /// attached run bound to `(chat, message)`.
    pub fn pause_other_attached_runs(
        &self,
        chat_id: i64,
        message_id: i64,
        except_session: Option<&str>,
    ) {
        let streams: Vec<Arc<Stream>> = {
            let state = self.inner.state.lock();
            state
                .runs
                .iter()
                .filter(|(name, run)| {
                    if except_session == Some(name.as_str()) {
                        return false;
                    }
                    let running = state
                        .sessions
                        .get(*name)
                        .map(|rec| rec.status == SessionStatus::Running)
                        .unwrap_or(false);
                    running
                        && run.is_alive()
                        && !run.is_paused()
                        && run.stream.chat_id() == chat_id
                        && run.stream.message_id() == message_id
                })
                .map(|(_, run)| Arc::clone(&run.stream))
                .collect()
        };
        for stream in streams {
            stream.pause();
        }
    }

    /// Any live run whose stream writes into this chat?
    pub fn has_running_in_chat(&self, chat_id: i64) -> bool {
        let state = self.inner.state.lock();
        state.runs.iter().any(|(name, run)| {
            let running = state
                .sessions
                .get(name)
                .map(|rec| rec.status == SessionStatus::Running)
                .unwrap_or(false);
            running && run.is_alive() && run.stream.chat_id() == chat_id
        })
    }

    // ---- panel bindings ----------------------------------------------

    pub fn panel_message_id(&self, chat_id: i64) -> Option<i64> {
        self.inner.state.lock().panel_by_chat.get(&chat_id).copied()
    }

    pub async fn set_panel_message_id(&self, chat_id: i64, message_id: i64) {
        self.inner
            .state
            .lock()
            .panel_by_chat
            .insert(chat_id, message_id);
        self.save_state().await;
    }

    /// Drop the binding without persisting; the next panel send rebinds and
    /// saves.
    pub fn drop_panel_binding(&self, chat_id: i64) -> Option<i64> {
        self.inner.state.lock().panel_by_chat.remove(&chat_id)
    }

    pub fn restore_panel_binding(&self, chat_id: i64, message_id: i64) {
        self.inner
            .state
            .lock()
            .panel_by_chat
            .insert(chat_id, message_id);
    }

    // ---- path presets -------------------------------------------------

    pub fn path_presets(&self) -> Vec<String> {
        self.inner.state.lock().path_presets.clone()
    }

    pub async fn upsert_path_preset(&self, path: &str) {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return;
        }
        let added = {
            let mut state = self.inner.state.lock();
            if state.path_presets.iter().any(|p| p == trimmed) {
                false
            } else {
                state.path_presets.push(trimmed.to_string());
                true
            }
        };
        if added {
            self.save_state().await;
        }
    }

    pub async fn delete_path_preset(&self, index: usize) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            if index < state.path_presets.len() {
                state.path_presets.remove(index);
                true
            } else {
                false
            }
        };
        if removed {
            self.save_state().await;
        }
        removed
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
