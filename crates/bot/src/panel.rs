// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-chat panel message and its degradation ladder.
//!
//! Rendering tries strategies in a fixed order: HTML edit, one rate-limit
//! retry, trimmed code-block edit on length overflow, tag-stripped plain
//! edit on entity errors, and finally a replacement message that rebinds the
//! per-chat panel id.

use std::sync::Arc;

use tether_adapters::{ChatTransport, InlineKeyboardMarkup, ParseMode, TransportError};
use tether_core::{safe_html_code_block, strip_html_tags, truncate_text, MAX_MESSAGE_CHARS};
use tether_engine::Registry;
use tracing::warn;

/// Placeholder body for a brand-new panel message.
const PANEL_PLACEHOLDER: &str = "<b>tether</b>\n\nLoading…";

#[derive(Clone)]
pub struct PanelRenderer {
    registry: Registry,
    transport: Arc<dyn ChatTransport>,
}

impl PanelRenderer {
    pub fn new(registry: Registry) -> Self {
        let transport = registry.transport();
        Self {
            registry,
            transport,
        }
    }

    /// The chat's panel message id, sending a placeholder and persisting the
    /// binding when none exists yet.
    pub async fn ensure_panel(&self, chat_id: i64) -> Result<i64, TransportError> {
        if let Some(existing) = self.registry.panel_message_id(chat_id) {
            return Ok(existing);
        }
        let message_id = self
            .transport
            .send_message(chat_id, PANEL_PLACEHOLDER, Some(ParseMode::Html), None)
            .await?;
        self.registry.set_panel_message_id(chat_id, message_id).await;
        Ok(message_id)
    }

    /// Render into the bound panel, creating it if needed. Returns the
    /// message id that ended up showing the content.
    pub async fn render_panel(
        &self,
        chat_id: i64,
        text_html: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, TransportError> {
        let message_id = self.ensure_panel(chat_id).await?;
        Ok(self
            .render_to_message(chat_id, message_id, text_html, reply_markup, true)
            .await)
    }

    /// The degradation ladder against a specific message.
    pub async fn render_to_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text_html: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
        update_state_on_replace: bool,
    ) -> i64 {
        let edit = |text: String, parse_mode: Option<ParseMode>| {
            let transport = Arc::clone(&self.transport);
            async move {
                transport
                    .edit_message_text(chat_id, message_id, &text, parse_mode, reply_markup)
                    .await
            }
        };

        let first_error = match edit(text_html.to_string(), Some(ParseMode::Html)).await {
            Ok(()) => return message_id,
            Err(TransportError::NotModified) => return message_id,
            Err(e) => e,
        };

        match first_error {
            TransportError::RateLimited { retry_after } => {
                tokio::time::sleep(retry_after).await;
                match edit(text_html.to_string(), Some(ParseMode::Html)).await {
                    Ok(()) | Err(TransportError::NotModified) => message_id,
                    Err(e) => {
                        warn!(chat_id, message_id, error = %e, "panel edit retry failed; replacing panel");
                        self.send_replacement(
                            chat_id,
                            text_html,
                            Some(ParseMode::Html),
                            reply_markup,
                            update_state_on_replace,
                        )
                        .await
                        .unwrap_or(message_id)
                    }
                }
            }

            TransportError::TooLong => {
                let trimmed =
                    safe_html_code_block(&strip_html_tags(text_html), MAX_MESSAGE_CHARS);
                match edit(trimmed, Some(ParseMode::Html)).await {
                    Ok(()) | Err(TransportError::NotModified) => message_id,
                    Err(e) => {
                        warn!(chat_id, message_id, error = %e, "panel edit failed after trimming");
                        self.plain_or_replace(
                            chat_id,
                            message_id,
                            text_html,
                            reply_markup,
                            update_state_on_replace,
                        )
                        .await
                    }
                }
            }

            TransportError::ParseEntities(reason) => {
                warn!(chat_id, message_id, reason = %reason, "panel HTML rejected; degrading to plain");
                self.plain_or_replace(
                    chat_id,
                    message_id,
                    text_html,
                    reply_markup,
                    update_state_on_replace,
                )
                .await
            }

            TransportError::CannotEdit(reason) => {
                warn!(chat_id, message_id, reason = %reason, "panel gone; sending replacement");
                self.send_replacement(
                    chat_id,
                    text_html,
                    Some(ParseMode::Html),
                    reply_markup,
                    update_state_on_replace,
                )
                .await
                .unwrap_or(message_id)
            }

            e => {
                warn!(chat_id, message_id, error = %e, "panel edit failed; sending replacement");
                self.send_replacement(
                    chat_id,
                    text_html,
                    Some(ParseMode::Html),
                    reply_markup,
                    update_state_on_replace,
                )
                .await
                .unwrap_or(message_id)
            }
        }
    }

    /// Last resort before replacement: tag-stripped plain edit.
    async fn plain_or_replace(
        &self,
        chat_id: i64,
        message_id: i64,
        text_html: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
        update_state_on_replace: bool,
    ) -> i64 {
        let plain = truncate_text(&strip_html_tags(text_html), MAX_MESSAGE_CHARS);
        match self
            .transport
            .edit_message_text(chat_id, message_id, &plain, None, reply_markup)
            .await
        {
            Ok(()) | Err(TransportError::NotModified) => message_id,
            Err(e) => {
                warn!(chat_id, message_id, error = %e, "plain panel edit failed; replacing panel");
                self.send_replacement(chat_id, &plain, None, reply_markup, update_state_on_replace)
                    .await
                    .unwrap_or(message_id)
            }
        }
    }

    async fn send_replacement(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_markup: Option<&InlineKeyboardMarkup>,
        update_state: bool,
    ) -> Option<i64> {
        match self
            .transport
            .send_message(chat_id, text, parse_mode, reply_markup)
            .await
        {
            Ok(new_id) => {
                if update_state {
                    self.registry.set_panel_message_id(chat_id, new_id).await;
                }
                Some(new_id)
            }
            Err(e) => {
                warn!(chat_id, error = %e, "replacement panel send failed");
                None
            }
        }
    }

    /// Delete a message, swallowing every error.
    pub async fn delete_message_best_effort(&self, chat_id: i64, message_id: i64) {
        if let Err(e) = self.transport.delete_message(chat_id, message_id).await {
            tracing::debug!(chat_id, message_id, error = %e, "delete failed (ignored)");
        }
    }
}

#[cfg(test)]
#[path = "panel_tests.rs"]
mod tests;
