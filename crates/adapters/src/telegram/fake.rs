// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording fake transport for tests.
//!
//! Records every call, hands out increasing message ids, and can be primed
//! with error scripts per operation so callers' retry/degradation ladders
//! can be exercised deterministically.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ChatTransport, FileRef, InlineKeyboardMarkup, ParseMode, TransportError};

/// One recorded outgoing payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SentPayload {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    pub html: bool,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Default)]
struct FakeState {
    sends: Vec<SentPayload>,
    edits: Vec<SentPayload>,
    deleted: Vec<(i64, i64)>,
    answered_callbacks: Vec<String>,
    downloads: Vec<(String, std::path::PathBuf)>,
    send_errors: VecDeque<TransportError>,
    edit_errors: VecDeque<TransportError>,
}

/// In-memory [`ChatTransport`] used across the workspace's tests.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<FakeState>>,
    next_message_id: Arc<AtomicI64>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            next_message_id: Arc::new(AtomicI64::new(100)),
        }
    }

    /// Queue an error for the next `send_message` call.
    pub fn push_send_error(&self, error: TransportError) {
        self.state.lock().send_errors.push_back(error);
    }

    /// Queue an error for the next `edit_message_text` call.
    pub fn push_edit_error(&self, error: TransportError) {
        self.state.lock().edit_errors.push_back(error);
    }

    pub fn sends(&self) -> Vec<SentPayload> {
        self.state.lock().sends.clone()
    }

    pub fn edits(&self) -> Vec<SentPayload> {
        self.state.lock().edits.clone()
    }

    pub fn last_edit(&self) -> Option<SentPayload> {
        self.state.lock().edits.last().cloned()
    }

    pub fn deleted(&self) -> Vec<(i64, i64)> {
        self.state.lock().deleted.clone()
    }

    pub fn answered_callbacks(&self) -> Vec<String> {
        self.state.lock().answered_callbacks.clone()
    }

    pub fn downloads(&self) -> Vec<(String, std::path::PathBuf)> {
        self.state.lock().downloads.clone()
    }

    pub fn edit_count(&self) -> usize {
        self.state.lock().edits.len()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.send_errors.pop_front() {
            return Err(error);
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        state.sends.push(SentPayload {
            chat_id,
            message_id,
            text: text.to_string(),
            html: matches!(parse_mode, Some(ParseMode::Html)),
            reply_markup: reply_markup.cloned(),
        });
        Ok(message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.edit_errors.pop_front() {
            return Err(error);
        }
        state.edits.push(SentPayload {
            chat_id,
            message_id,
            text: text.to_string(),
            html: matches!(parse_mode, Some(ParseMode::Html)),
            reply_markup: reply_markup.cloned(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        self.state.lock().deleted.push((chat_id, message_id));
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TransportError> {
        self.state
            .lock()
            .answered_callbacks
            .push(callback_query_id.to_string());
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<FileRef, TransportError> {
        Ok(FileRef {
            file_id: file_id.to_string(),
            file_path: Some(format!("documents/{file_id}.bin")),
            file_size: None,
        })
    }

    async fn download_file(&self, file: &FileRef, dest: &Path) -> Result<(), TransportError> {
        tokio::fs::write(dest, b"fake download")
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        self.state
            .lock()
            .downloads
            .push((file.file_id.clone(), dest.to_path_buf()));
        Ok(())
    }
}
