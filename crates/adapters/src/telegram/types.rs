// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incoming Bot API wire types, reduced to the fields tether reads.
//! Everything is optional-tolerant; unknown fields are ignored by serde.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// `private`, `group`, `supergroup`, `channel`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media_group_id: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
    /// Photos arrive as a list of sizes, smallest first.
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub audio: Option<Document>,
    #[serde(default)]
    pub video: Option<Document>,
    #[serde(default)]
    pub voice: Option<Document>,
    #[serde(default)]
    pub animation: Option<Document>,
}

impl Message {
    pub fn has_attachment(&self) -> bool {
        self.document.is_some()
            || self.photo.as_ref().is_some_and(|p| !p.is_empty())
            || self.audio.is_some()
            || self.video.is_some()
            || self.voice.is_some()
            || self.animation.is_some()
    }
}

/// Generic file-like attachment; audio/video/voice/animation share the
/// fields tether cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}
