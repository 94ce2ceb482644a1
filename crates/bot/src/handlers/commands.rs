// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slash commands.

use std::sync::Arc;

use tether_adapters::Message;
use tracing::warn;

use crate::ctx::BotCtx;
use crate::render::render_and_sync;
use crate::ui::state::{Mode, NewDraft};

use super::{delete_user_message_best_effort, ensure_authorized};

/// Split a command line into tokens, honoring single and double quotes, and
/// strip a `@botname` suffix from the command itself.
pub fn parse_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_token = false;

    for c in text.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    has_token = true;
                }
                c if c.is_whitespace() => {
                    if has_token || !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    has_token = true;
                }
            },
        }
    }
    if has_token || !current.is_empty() {
        tokens.push(current);
    }

    if let Some(first) = tokens.first_mut() {
        if let Some(at) = first.find('@') {
            first.truncate(at);
        }
    }
    tokens
}

/// `/start` and `/menu`: reset navigation and move the panel to the bottom
/// of the chat (unless a live stream owns it here).
pub async fn cmd_start(ctx: &Arc<BotCtx>, message: &Message) {
    reset_to_fresh_panel(ctx, message).await;
}

pub async fn cmd_menu(ctx: &Arc<BotCtx>, message: &Message) {
    reset_to_fresh_panel(ctx, message).await;
}

async fn reset_to_fresh_panel(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }

    ctx.ui.with(chat_id, |ui| {
        ui.nav_reset();
        ui.mode = Mode::Sessions;
    });

    let old_panel_id = ctx.registry.panel_message_id(chat_id);
    let has_running_in_chat = ctx.registry.has_running_in_chat(chat_id);

    if !has_running_in_chat {
        ctx.registry.drop_panel_binding(chat_id);
    }

    render_and_sync(ctx, chat_id).await;

    let new_panel_id = ctx.registry.panel_message_id(chat_id);
    if new_panel_id.is_none() {
        // The fresh panel never materialized; keep the old binding usable.
        if let (false, Some(old)) = (has_running_in_chat, old_panel_id) {
            ctx.registry.restore_panel_binding(chat_id, old);
        }
        warn!(chat_id, "panel reset failed");
        return;
    }

    if !has_running_in_chat {
        if let (Some(old), Some(new)) = (old_panel_id, new_panel_id) {
            if old != new {
                ctx.panel.delete_message_best_effort(chat_id, old).await;
            }
        }
    }

    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;
}

pub async fn cmd_list(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;
    ctx.ui.with(chat_id, |ui| ui.mode = Mode::Sessions);
    render_and_sync(ctx, chat_id).await;
}

pub async fn cmd_use(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;

    let tokens = parse_tokens(message.text.as_deref().unwrap_or(""));
    if tokens.len() != 2 {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("Usage: /use <name>");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }
    let name = tokens[1].clone();
    if !ctx.registry.has_session(&name) {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice(format!("Unknown session: {name}"));
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }

    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::Session;
        ui.session = Some(name.clone());
    });
    render_and_sync(ctx, chat_id).await;
}

pub async fn cmd_new(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;

    let tokens = parse_tokens(message.text.as_deref().unwrap_or(""));
    if tokens.len() >= 3 {
        match ctx.registry.create_session(&tokens[1], &tokens[2]).await {
            Ok(rec) => {
                ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::Session;
                    ui.session = Some(rec.name.clone());
                });
            }
            Err(e) => {
                ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::NewName;
                    ui.set_notice(e.to_string());
                });
            }
        }
        render_and_sync(ctx, chat_id).await;
        return;
    }

    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::NewName;
        ui.new_draft = Some(NewDraft::default());
    });
    render_and_sync(ctx, chat_id).await;
}

pub async fn cmd_stop(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;

    let tokens = parse_tokens(message.text.as_deref().unwrap_or(""));
    let fallback = ctx.ui.with(chat_id, |ui| ui.session.clone());
    let target = tokens.get(1).cloned().or(fallback);
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected to stop.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };

    if !ctx.registry.has_session(&target) {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice(format!("Unknown session: {target}"));
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }
    if !ctx.registry.is_running(&target) {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Session;
            ui.session = Some(target.clone());
            ui.set_notice("This session is not running.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }

    let paused = ctx
        .registry
        .run(&target)
        .map(|run| run.is_paused())
        .unwrap_or(false);
    ctx.registry.stop(&target).await;
    if paused {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Session;
            ui.session = Some(target.clone());
            ui.set_notice("Stop requested…");
        });
        render_and_sync(ctx, chat_id).await;
    }
}

pub async fn cmd_logs(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;

    let tokens = parse_tokens(message.text.as_deref().unwrap_or(""));
    let fallback = ctx.ui.with(chat_id, |ui| ui.session.clone());
    let target = tokens.get(1).cloned().or(fallback);
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected. Use /logs <name>.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };

    if !ctx.registry.has_session(&target) {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice(format!("Unknown session: {target}"));
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }

    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::Logs;
        ui.session = Some(target.clone());
    });
    render_and_sync(ctx, chat_id).await;
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
