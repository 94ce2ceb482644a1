// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Update handlers: commands, free text, attachments, inline callbacks.

pub mod attach;
pub mod attachments;
pub mod callback;
pub mod commands;
pub mod text;

use std::sync::Arc;

use tether_adapters::Chat;
use tracing::info;

use crate::ctx::BotCtx;
use crate::ui::screens;
use crate::ui::state::Mode;

/// Gate every update on the single owner. On denial the panel shows the
/// access-denied home screen.
pub async fn ensure_authorized(ctx: &Arc<BotCtx>, user_id: Option<i64>, chat_id: i64) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if ctx.registry.ensure_owner(user_id).await {
        return true;
    }

    info!(user_id, chat_id, "access denied");
    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::Home;
        ui.set_notice("Access denied.");
    });
    let (text_html, markup) = screens::render_home(&ctx.registry, Some("Access denied."));
    let _ = ctx
        .panel
        .render_panel(chat_id, &text_html, Some(&markup))
        .await;
    false
}

/// Delete the user's message to keep the chat clean: always in private
/// chats, in groups only behind the env toggle, never elsewhere.
pub async fn delete_user_message_best_effort(ctx: &Arc<BotCtx>, chat: &Chat, message_id: i64) {
    match chat.kind.as_str() {
        "private" => {}
        "group" | "supergroup" => {
            if !tether_adapters::env::delete_messages_in_groups() {
                return;
            }
        }
        _ => return,
    }
    ctx.panel.delete_message_best_effort(chat.id, message_id).await;
}
