// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-adapters: boundaries to external systems — the chat transport and
//! the agent CLI.

pub mod codex;
pub mod env;
pub mod git;
pub mod telegram;

pub use codex::{build_codex_cmd, discover_model_presets, APPROVAL_POLICIES, SANDBOX_MODES};
pub use git::detect_git_dir;
pub use telegram::{
    CallbackQuery, Chat, ChatTransport, Document, FileRef, InlineKeyboardButton,
    InlineKeyboardMarkup, Message, ParseMode, PhotoSize, TelegramApi, TransportError, Update,
    UpdatePoller, User,
};

#[cfg(any(test, feature = "test-support"))]
pub use telegram::fake::RecordingTransport;
