// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Modal navigation state, one instance per chat, in memory only.
//!
//! Navigation history is a bounded stack of snapshots; pushes dedup against
//! the current snapshot and pops skip entries equal to it, so "back" always
//! lands on something visibly different.

use std::collections::HashMap;

use parking_lot::Mutex;
use tether_core::RunMode;
use tether_engine::Registry;

/// Maximum retained navigation snapshots.
const NAV_STACK_CAP: usize = 32;

/// UI modes (screens).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Home,
    #[default]
    Sessions,
    Session,
    NewName,
    NewPath,
    Paths,
    PathsAdd,
    ConfirmMkdir,
    ConfirmDelete,
    ConfirmStop,
    Model,
    ModelCustom,
    Logs,
    AwaitPrompt,
}

/// Draft state of the new-session wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDraft {
    pub name: Option<String>,
}

/// Which flow asked for a directory to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MkdirFlow {
    NewPath,
    PathsAdd,
}

/// A directory creation waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MkdirDraft {
    pub path: String,
    pub flow: MkdirFlow,
}

/// Pending prompt request (the await-prompt screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwaitPrompt {
    pub run_mode: RunMode,
}

/// The navigable portion of the UI state; what "back" restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSnapshot {
    pub mode: Mode,
    pub session: Option<String>,
    pub new_draft: Option<NewDraft>,
    pub await_prompt: Option<AwaitPrompt>,
}

impl NavSnapshot {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session;
        self
    }

    pub fn with_new_draft(mut self, draft: Option<NewDraft>) -> Self {
        self.new_draft = draft;
        self
    }

    pub fn with_await_prompt(mut self, await_prompt: Option<AwaitPrompt>) -> Self {
        self.await_prompt = await_prompt;
        self
    }
}

/// Full per-chat UI state. Everything here is ephemeral.
#[derive(Debug, Default)]
pub struct UiState {
    pub mode: Mode,
    pub session: Option<String>,
    pub new_draft: Option<NewDraft>,
    pub await_prompt: Option<AwaitPrompt>,
    pub mkdir: Option<MkdirDraft>,
    /// One-shot notice rendered (and consumed) by the next screen.
    pub notice: Option<String>,
    /// A path echoed back in monospace alongside the notice.
    pub notice_code: Option<String>,
    /// Session-name order behind `sess(idx)` buttons.
    pub sess_list: Vec<String>,
    /// Suggested auto-name shown on the new-name screen.
    pub auto_name: Option<String>,
    nav: Vec<NavSnapshot>,
}

impl UiState {
    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            mode: self.mode,
            session: self.session.clone(),
            new_draft: self.new_draft.clone(),
            await_prompt: self.await_prompt,
        }
    }

    fn apply(&mut self, snap: NavSnapshot) {
        self.mode = snap.mode;
        self.session = snap.session;
        self.new_draft = snap.new_draft;
        self.await_prompt = snap.await_prompt;
    }

    /// Navigate to `target`, pushing the current snapshot when it differs.
    pub fn go(&mut self, target: NavSnapshot) {
        let current = self.snapshot();
        if target != current {
            self.nav.push(current);
            if self.nav.len() > NAV_STACK_CAP {
                self.nav.drain(..NAV_STACK_CAP / 2);
            }
        }
        self.apply(target);
    }

    /// Replace the current screen without touching history.
    pub fn set(&mut self, target: NavSnapshot) {
        self.apply(target);
    }

    /// Pop back to the nearest snapshot that differs from the current one.
    /// Returns false on an exhausted stack (caller falls back to the list).
    pub fn pop(&mut self) -> bool {
        let current = self.snapshot();
        while let Some(snap) = self.nav.pop() {
            if snap == current {
                continue;
            }
            self.apply(snap);
            return true;
        }
        false
    }

    pub fn nav_reset(&mut self) {
        self.nav.clear();
    }

    pub fn nav_reset_to(&mut self, base: NavSnapshot) {
        self.nav = vec![base];
    }

    #[cfg(test)]
    pub(crate) fn nav_len(&self) -> usize {
        self.nav.len()
    }

    /// Drop a session focus that no longer exists.
    pub fn sanitize(&mut self, registry: &Registry) {
        let needs_session = matches!(
            self.mode,
            Mode::Session
                | Mode::Logs
                | Mode::Model
                | Mode::ModelCustom
                | Mode::ConfirmDelete
                | Mode::ConfirmStop
                | Mode::AwaitPrompt
        );
        if !needs_session {
            return;
        }
        let known = self
            .session
            .as_deref()
            .map(|name| registry.has_session(name))
            .unwrap_or(false);
        if !known {
            self.mode = Mode::Sessions;
        }
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Consume the one-shot notice fields for rendering.
    pub fn take_notices(&mut self) -> (Option<String>, Option<String>) {
        (self.notice.take(), self.notice_code.take())
    }
}

/// Per-chat UI states behind one lock.
#[derive(Default)]
pub struct UiRegistry {
    chats: Mutex<HashMap<i64, UiState>>,
}

impl UiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the chat's UI state, creating it on first contact.
    pub fn with<R>(&self, chat_id: i64, f: impl FnOnce(&mut UiState) -> R) -> R {
        let mut chats = self.chats.lock();
        f(chats.entry(chat_id).or_default())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
