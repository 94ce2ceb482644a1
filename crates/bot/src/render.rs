// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Render-and-sync: bring the chat's panel message in line with its UI
//! state, re-attaching to a live stream when the focused session's run owns
//! the panel message.

use std::sync::Arc;

use tracing::warn;

use crate::ctx::BotCtx;
use crate::handlers::attach::attach_running_session;
use crate::ui::screens;
use crate::ui::state::Mode;

pub async fn render_and_sync(ctx: &Arc<BotCtx>, chat_id: i64) {
    let panel_id = match ctx.registry.panel_message_id(chat_id) {
        Some(id) => id,
        None => match ctx.panel.ensure_panel(chat_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id, error = %e, "failed to create panel");
                return;
            }
        },
    };

    // Attach fast path: while the focused session's run owns this panel
    // message, the stream is the renderer and the panel must stay away.
    let (mode, session) = ctx.ui.with(chat_id, |ui| (ui.mode, ui.session.clone()));
    if mode == Mode::Session {
        if let Some(name) = session.as_deref() {
            if ctx.registry.is_running(name) {
                if let Some(run) = ctx.registry.run(name) {
                    if run.stream.chat_id() == chat_id && run.stream.message_id() == panel_id {
                        ctx.ui.with(chat_id, |ui| ui.notice = None);
                        attach_running_session(ctx, chat_id, panel_id, name);
                        return;
                    }
                }
            }
        }
    }

    ctx.registry.pause_other_attached_runs(chat_id, panel_id, None);

    let (text_html, markup) = ctx.ui.with(chat_id, |ui| {
        screens::render_current(&ctx.registry, &ctx.model_presets, ui)
    });
    ctx.panel
        .render_to_message(chat_id, panel_id, &text_html, Some(&markup), true)
        .await;
}
