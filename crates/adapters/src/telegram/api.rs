// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bot API client over HTTPS.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::Update;
use super::{
    classify_api_error, ChatTransport, FileRef, InlineKeyboardMarkup, ParseMode, TransportError,
};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout requested from `getUpdates`.
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize)]
struct ApiFile {
    file_id: String,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message_id: i64,
}

/// Production [`ChatTransport`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl TelegramApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base(token, DEFAULT_API_BASE)
    }

    /// Point the client at a different API host (tests, local bot servers).
    pub fn with_base(token: impl Into<String>, base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            // Long polls hold the connection open for POLL_TIMEOUT.
            .timeout(POLL_TIMEOUT + Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base: base.into(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if envelope.ok {
            return envelope.result.ok_or_else(|| TransportError::Api {
                code: 0,
                description: format!("{method}: ok response without result"),
            });
        }

        Err(classify_api_error(
            envelope.error_code.unwrap_or(0),
            envelope.description.as_deref().unwrap_or(""),
            envelope.parameters.and_then(|p| p.retry_after),
        ))
    }

    fn text_payload(
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Value {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(ParseMode::Html) = parse_mode {
            body["parse_mode"] = json!("HTML");
        }
        if let Some(markup) = reply_markup {
            if let Ok(value) = serde_json::to_value(markup) {
                body["reply_markup"] = value;
            }
        }
        body
    }

    /// Fetch a batch of updates after `offset` (exclusive).
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        let mut body = json!({
            "timeout": POLL_TIMEOUT.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body).await
    }
}

#[async_trait]
impl ChatTransport for TelegramApi {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, TransportError> {
        let body = Self::text_payload(chat_id, text, parse_mode, reply_markup);
        let message: ApiMessage = self.call("sendMessage", body).await?;
        Ok(message.message_id)
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TransportError> {
        let mut body = Self::text_payload(chat_id, text, parse_mode, reply_markup);
        body["message_id"] = json!(message_id);
        let _: Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TransportError> {
        let _: Value = self
            .call(
                "deleteMessage",
                json!({"chat_id": chat_id, "message_id": message_id}),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TransportError> {
        let _: Value = self
            .call(
                "answerCallbackQuery",
                json!({"callback_query_id": callback_query_id}),
            )
            .await?;
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<FileRef, TransportError> {
        let file: ApiFile = self.call("getFile", json!({"file_id": file_id})).await?;
        Ok(FileRef {
            file_id: file.file_id,
            file_path: file.file_path,
            file_size: file.file_size,
        })
    }

    async fn download_file(&self, file: &FileRef, dest: &Path) -> Result<(), TransportError> {
        let Some(file_path) = &file.file_path else {
            return Err(TransportError::Api {
                code: 0,
                description: format!("file {} has no download path", file.file_id),
            });
        };

        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Api {
                code: i64::from(response.status().as_u16()),
                description: format!("file download failed for {}", file.file_id),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(())
    }
}

/// Cursor over `getUpdates`, acknowledging as it goes.
pub struct UpdatePoller {
    api: TelegramApi,
    offset: Option<i64>,
}

impl UpdatePoller {
    pub fn new(api: TelegramApi) -> Self {
        Self { api, offset: None }
    }

    /// Next batch of updates; advances the offset past everything returned.
    pub async fn next_batch(&mut self) -> Result<Vec<Update>, TransportError> {
        let updates = self.api.get_updates(self.offset).await?;
        if let Some(last) = updates.last() {
            self.offset = Some(last.update_id + 1);
        }
        Ok(updates)
    }
}
