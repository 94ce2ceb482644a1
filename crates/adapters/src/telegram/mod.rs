// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat transport boundary.
//!
//! [`ChatTransport`] is the seam the engine and UI are written against; the
//! production implementation is [`TelegramApi`], tests use the recording
//! fake. Errors are classified into the taxonomy the callers' fallback
//! ladders key off.

pub mod api;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use api::{TelegramApi, UpdatePoller};
pub use types::{CallbackQuery, Chat, Document, Message, PhotoSize, Update, User};

/// One inline keyboard button. Only callback buttons are used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    pub fn new(rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self {
            inline_keyboard: rows,
        }
    }
}

/// Parse mode for outgoing messages; plain text when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

/// A file handle resolved via `getFile`, ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
}

/// Transport failure classes. The distinctions drive retry and degradation
/// decisions upstream, so classification happens here, once.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Flood control; retry no earlier than `retry_after`.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },
    /// The edit would not change the message; callers treat as success.
    #[error("message is not modified")]
    NotModified,
    #[error("message is too long")]
    TooLong,
    /// The HTML payload did not parse; degrade to plain text.
    #[error("can't parse entities: {0}")]
    ParseEntities(String),
    /// The message is gone or was never editable; re-send instead.
    #[error("message can't be edited: {0}")]
    CannotEdit(String),
    /// Connection-level failure; transient.
    #[error("network error: {0}")]
    Network(String),
    /// Anything else the API refused.
    #[error("chat API error {code}: {description}")]
    Api { code: i64, description: String },
}

impl TransportError {
    /// Errors worth a blind retry (beyond the advised rate-limit wait).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. } | TransportError::Network(_)
        )
    }
}

/// Classify a Bot API refusal from its error code, description, and the
/// optional `retry_after` hint.
pub fn classify_api_error(
    code: i64,
    description: &str,
    retry_after: Option<u64>,
) -> TransportError {
    if let Some(secs) = retry_after {
        return TransportError::RateLimited {
            retry_after: Duration::from_secs(secs),
        };
    }
    if code == 429 {
        return TransportError::RateLimited {
            retry_after: Duration::from_secs(2),
        };
    }

    let lowered = description.to_lowercase();
    if lowered.contains("message is not modified") {
        return TransportError::NotModified;
    }
    if lowered.contains("message is too long") || lowered.contains("message_too_long") {
        return TransportError::TooLong;
    }
    // Both the ASCII and typographic apostrophe spellings occur in the wild.
    if lowered.contains("can't parse entities") || lowered.contains("can’t parse entities") {
        return TransportError::ParseEntities(description.to_string());
    }
    if lowered.contains("message can't be edited")
        || lowered.contains("message to edit not found")
        || lowered.contains("message to delete not found")
        || lowered.contains("message_id_invalid")
        || lowered.contains("chat not found")
    {
        return TransportError::CannotEdit(description.to_string());
    }

    TransportError::Api {
        code,
        description: description.to_string(),
    }
}

/// The chat transport contract consumed by the rest of the system.
///
/// Web page previews are always disabled; every text payload is either HTML
/// (`Some(ParseMode::Html)`) or plain.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message; returns the new message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, TransportError>;

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TransportError>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError>;

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TransportError>;

    async fn get_file(&self, file_id: &str) -> Result<FileRef, TransportError>;

    async fn download_file(&self, file: &FileRef, dest: &Path) -> Result<(), TransportError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
