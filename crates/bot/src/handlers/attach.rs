// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The attach/detach bridge between the panel and live streams.
//!
//! [`attach_running_session`] is the only path that re-binds a run's stream
//! to a message: it pauses every other attached run first, so at most one
//! stream per message is ever resumed.

use std::sync::Arc;

use tether_engine::{running_keyboard, working_footer, working_footer_plain_len, Registry};

use crate::ctx::BotCtx;

/// Pause the stream owning `(chat, message)` before the panel writes to it.
/// No-op when nothing is attached or the stream is already paused.
pub fn auto_detach_if_running(ctx: &Arc<BotCtx>, chat_id: i64, message_id: i64) {
    let name = ctx
        .registry
        .resolve_attached_running_session(chat_id, message_id)
        .or_else(|| ctx.registry.resolve_session_for_run_message(chat_id, message_id));
    let Some(name) = name else {
        return;
    };
    if !ctx.registry.is_running(&name) {
        return;
    }
    let Some(run) = ctx.registry.run(&name) else {
        return;
    };
    if !run.is_paused() {
        run.stream.pause();
    }
}

/// Attach a running session's stream to a message: pause the others,
/// register the mapping, restore the running presentation, resume.
pub fn attach_running_session(ctx: &Arc<BotCtx>, chat_id: i64, message_id: i64, name: &str) {
    if !ctx.registry.is_running(name) {
        return;
    }
    let Some(run) = ctx.registry.run(name) else {
        return;
    };

    ctx.registry
        .pause_other_attached_runs(chat_id, message_id, Some(name));
    ctx.registry.register_run_message(chat_id, message_id, name);

    run.set_confirm_stop(false);
    run.stream.set_header("", 0);
    run.stream.set_footer(
        Some(working_footer(run.started)),
        working_footer_plain_len(),
        Some(true),
    );
    run.stream.set_reply_markup(Some(running_keyboard()));
    run.stream.resume();
}

/// The session a callback on `(chat, message)` refers to: the attached
/// running one, the registered one, or the chat's UI focus.
pub fn resolve_session_for_callback_message(
    registry: &Registry,
    chat_id: i64,
    message_id: Option<i64>,
    fallback: Option<String>,
) -> Option<String> {
    let Some(message_id) = message_id else {
        return fallback;
    };
    registry
        .resolve_attached_running_session(chat_id, message_id)
        .or_else(|| registry.resolve_session_for_run_message(chat_id, message_id))
        .or(fallback)
}
