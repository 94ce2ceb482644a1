// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline-button callback dispatch.
//!
//! Tokens are `v3:<action>[:<arg>]`. Before any action that is not part of
//! the stop/detach family, a stream attached to the tapped message is
//! opportunistically paused so panel rendering cannot race the multiplexer.

use std::sync::Arc;

use tether_adapters::CallbackQuery;
use tether_core::{parse_cb, ReasoningEffort};
use tracing::info;

use crate::ctx::BotCtx;
use crate::render::render_and_sync;
use crate::ui::screens::{
    build_running_header_html, build_running_header_plain_len, stop_confirm_keyboard,
    STOP_CONFIRM_QUESTION,
};
use crate::ui::state::{MkdirFlow, Mode, NewDraft};

use super::attach::{
    attach_running_session, auto_detach_if_running, resolve_session_for_callback_message,
};
use super::ensure_authorized;
use super::text::{create_session_and_focus, try_mkdir};

/// Actions handled without auto-detaching the tapped message's stream.
const STOP_FAMILY: &[&str] = &["stop", "stop_yes", "stop_no", "interrupt", "detach"];

pub async fn on_callback(ctx: &Arc<BotCtx>, query: &CallbackQuery) {
    let Some(message) = &query.message else {
        return;
    };
    let chat_id = message.chat.id;
    let message_id = message.message_id;
    let data = query.data.clone().unwrap_or_default();

    info!(chat_id, message_id, data = %data, "callback");

    let parsed = parse_cb(&data);

    // A callback arriving with no panel binding adopts the tapped message as
    // the panel (common after state loss), except for notice acks.
    if ctx.registry.panel_message_id(chat_id).is_none()
        && parsed.as_ref().map(|(action, _)| action.as_str()) != Some("ack")
    {
        ctx.registry.set_panel_message_id(chat_id, message_id).await;
    }

    if let Err(e) = ctx.transport.answer_callback_query(&query.id).await {
        tracing::debug!(error = %e, "answer_callback_query failed");
    }

    if !ensure_authorized(ctx, Some(query.from.id), chat_id).await {
        return;
    }
    let Some((action, arg)) = parsed else {
        return;
    };
    let action = action.as_str();
    let arg = arg.as_deref();

    let ui_session = ctx.ui.with(chat_id, |ui| ui.session.clone());

    if !STOP_FAMILY.contains(&action) {
        auto_detach_if_running(ctx, chat_id, message_id);
    }

    match action {
        "ack" => {
            ctx.panel.delete_message_best_effort(chat_id, message_id).await;
            return;
        }

        "home" => {
            ctx.ui.with(chat_id, |ui| {
                ui.nav_reset();
                ui.mode = Mode::Sessions;
            });
            render_and_sync(ctx, chat_id).await;
        }

        "back" => {
            ctx.ui.with(chat_id, |ui| {
                if !ui.pop() {
                    ui.mode = Mode::Sessions;
                }
            });
            ctx.ui.with(chat_id, |ui| ui.sanitize(&ctx.registry));
            render_and_sync(ctx, chat_id).await;
        }

        "sessions" => {
            ctx.ui.with(chat_id, |ui| {
                let target = ui.snapshot().with_mode(Mode::Sessions);
                ui.go(target);
            });
            render_and_sync(ctx, chat_id).await;
        }

        "restart" => {
            on_restart(ctx, chat_id).await;
            return;
        }

        "session" => {
            let target_name = arg
                .map(str::to_string)
                .filter(|s| !s.is_empty())
                .or(ui_session.clone());
            ctx.ui.with(chat_id, |ui| match &target_name {
                Some(name) if ctx.registry.has_session(name) => {
                    let target = ui
                        .snapshot()
                        .with_mode(Mode::Session)
                        .with_session(Some(name.clone()));
                    ui.go(target);
                }
                _ => {
                    let target = ui.snapshot().with_mode(Mode::Sessions);
                    ui.go(target);
                    ui.set_notice("No session selected.");
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "sess" => {
            let idx: i64 = arg.and_then(|a| a.parse().ok()).unwrap_or(-1);
            let names = ctx.ui.with(chat_id, |ui| {
                if ui.sess_list.is_empty() {
                    ctx.registry
                        .sessions_sorted()
                        .into_iter()
                        .map(|rec| rec.name)
                        .collect()
                } else {
                    ui.sess_list.clone()
                }
            });
            let picked = usize::try_from(idx).ok().and_then(|i| names.get(i).cloned());
            ctx.ui.with(chat_id, |ui| match &picked {
                Some(name) if ctx.registry.has_session(name) => {
                    let target = ui
                        .snapshot()
                        .with_mode(Mode::Session)
                        .with_session(Some(name.clone()));
                    ui.go(target);
                }
                Some(_) => {
                    ui.mode = Mode::Sessions;
                    ui.set_notice("Session not found. Refreshing…");
                }
                None => {
                    ui.mode = Mode::Sessions;
                    ui.set_notice("Stale session list. Refreshing…");
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "new" => {
            ctx.ui.with(chat_id, |ui| {
                let target = ui
                    .snapshot()
                    .with_mode(Mode::NewName)
                    .with_new_draft(Some(NewDraft::default()));
                ui.go(target);
            });
            render_and_sync(ctx, chat_id).await;
        }

        "new_auto" => {
            let auto_name = ctx
                .ui
                .with(chat_id, |ui| ui.auto_name.clone())
                .unwrap_or_else(|| ctx.registry.next_auto_session_name());
            if ctx.registry.has_session(&auto_name) {
                ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::NewName;
                    ui.set_notice("Auto-name is taken. Pick another.");
                });
            } else {
                ctx.ui.with(chat_id, |ui| {
                    let target = ui
                        .snapshot()
                        .with_mode(Mode::NewPath)
                        .with_new_draft(Some(NewDraft {
                            name: Some(auto_name.clone()),
                        }));
                    ui.go(target);
                });
            }
            render_and_sync(ctx, chat_id).await;
        }

        "path_pick" => {
            on_path_pick(ctx, chat_id, arg).await;
        }

        "paths" => {
            ctx.ui.with(chat_id, |ui| {
                let target = ui.snapshot().with_mode(Mode::Paths);
                ui.go(target);
            });
            render_and_sync(ctx, chat_id).await;
        }

        "paths_add" => {
            ctx.ui.with(chat_id, |ui| {
                let target = ui.snapshot().with_mode(Mode::PathsAdd);
                ui.go(target);
            });
            render_and_sync(ctx, chat_id).await;
        }

        "path_del" => {
            let idx: i64 = arg.and_then(|a| a.parse().ok()).unwrap_or(-1);
            let ok = match usize::try_from(idx) {
                Ok(i) => ctx.registry.delete_path_preset(i).await,
                Err(_) => false,
            };
            ctx.ui.with(chat_id, |ui| {
                ui.mode = Mode::Paths;
                ui.set_notice(if ok { "Deleted." } else { "Invalid preset index." });
            });
            render_and_sync(ctx, chat_id).await;
        }

        "logs" => {
            ctx.ui.with(chat_id, |ui| {
                match ui.session.clone().filter(|n| ctx.registry.has_session(n)) {
                    Some(name) => {
                        let target = ui
                            .snapshot()
                            .with_mode(Mode::Logs)
                            .with_session(Some(name));
                        ui.go(target);
                    }
                    None => {
                        let target = ui.snapshot().with_mode(Mode::Sessions);
                        ui.go(target);
                        ui.set_notice("No session selected.");
                    }
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "log" => {
            let session = ctx
                .ui
                .with(chat_id, |ui| ui.session.clone())
                .filter(|n| ctx.registry.has_session(n));
            let Some(name) = session else {
                ctx.ui.with(chat_id, |ui| {
                    let target = ui.snapshot().with_mode(Mode::Sessions);
                    ui.go(target);
                    ui.set_notice("No session selected.");
                });
                render_and_sync(ctx, chat_id).await;
                return;
            };
            if ctx.registry.is_running(&name) {
                attach_running_session(ctx, chat_id, message_id, &name);
                return;
            }
            ctx.ui.with(chat_id, |ui| {
                let target = ui
                    .snapshot()
                    .with_mode(Mode::Logs)
                    .with_session(Some(name.clone()));
                ui.go(target);
            });
            render_and_sync(ctx, chat_id).await;
        }

        // "disconnect" and "detach" share one implementation: freeze the
        // stream and fall back to the session list.
        "disconnect" | "detach" => {
            let name = resolve_session_for_callback_message(
                &ctx.registry,
                chat_id,
                Some(message_id),
                ui_session.clone(),
            );
            if let Some(name) = name {
                if ctx.registry.is_running(&name) {
                    if let Some(run) = ctx.registry.run(&name) {
                        run.stream.pause();
                    }
                }
            }
            ctx.ui.with(chat_id, |ui| {
                ui.nav_reset();
                ui.mode = Mode::Sessions;
            });
            render_and_sync(ctx, chat_id).await;
        }

        "attach" => {
            let session = ctx
                .ui
                .with(chat_id, |ui| ui.session.clone())
                .filter(|n| ctx.registry.is_running(n));
            match session {
                Some(name) => {
                    attach_running_session(ctx, chat_id, message_id, &name);
                    return;
                }
                None => {
                    ctx.ui.with(chat_id, |ui| {
                        ui.mode = Mode::Sessions;
                        ui.set_notice("Run is not active.");
                    });
                    render_and_sync(ctx, chat_id).await;
                }
            }
        }

        "model" => {
            ctx.ui.with(chat_id, |ui| {
                match ui.session.clone().filter(|n| ctx.registry.has_session(n)) {
                    Some(name) => {
                        let target = ui
                            .snapshot()
                            .with_mode(Mode::Model)
                            .with_session(Some(name));
                        ui.go(target);
                    }
                    None => {
                        ui.mode = Mode::Sessions;
                        ui.set_notice("No session selected.");
                    }
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "model_pick" => {
            let session = ctx
                .ui
                .with(chat_id, |ui| ui.session.clone())
                .filter(|n| ctx.registry.has_session(n));
            match session {
                Some(name) => {
                    let idx: i64 = arg.and_then(|a| a.parse().ok()).unwrap_or(-1);
                    let model = usize::try_from(idx)
                        .ok()
                        .and_then(|i| ctx.model_presets.get(i).cloned());
                    match model {
                        Some(model) => {
                            ctx.registry.set_model(&name, &model).await;
                            ctx.ui.with(chat_id, |ui| {
                                ui.mode = Mode::Model;
                                ui.session = Some(name.clone());
                                ui.set_notice(format!("Model: {model}"));
                            });
                        }
                        None => ctx.ui.with(chat_id, |ui| {
                            ui.mode = Mode::Model;
                            ui.set_notice("Invalid model.");
                        }),
                    }
                }
                None => ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::Sessions;
                    ui.set_notice("No session selected.");
                }),
            }
            render_and_sync(ctx, chat_id).await;
        }

        "reasoning_pick" => {
            let session = ctx
                .ui
                .with(chat_id, |ui| ui.session.clone())
                .filter(|n| ctx.registry.has_session(n));
            match session {
                Some(name) => match arg.and_then(ReasoningEffort::parse) {
                    Some(level) => {
                        ctx.registry.set_reasoning_effort(&name, level).await;
                        ctx.ui.with(chat_id, |ui| {
                            ui.mode = Mode::Model;
                            ui.session = Some(name.clone());
                            ui.set_notice(format!("Reasoning effort: {level}"));
                        });
                    }
                    None => ctx.ui.with(chat_id, |ui| {
                        ui.mode = Mode::Model;
                        ui.set_notice("Invalid reasoning effort.");
                    }),
                },
                None => ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::Sessions;
                    ui.set_notice("No session selected.");
                }),
            }
            render_and_sync(ctx, chat_id).await;
        }

        "model_custom" => {
            ctx.ui.with(chat_id, |ui| {
                let target = ui.snapshot().with_mode(Mode::ModelCustom);
                ui.go(target);
            });
            render_and_sync(ctx, chat_id).await;
        }

        "delete" => {
            ctx.ui.with(chat_id, |ui| {
                match ui.session.clone().filter(|n| ctx.registry.has_session(n)) {
                    Some(name) => {
                        ui.mode = Mode::ConfirmDelete;
                        ui.session = Some(name);
                    }
                    None => {
                        ui.mode = Mode::Sessions;
                        ui.set_notice("No session selected.");
                    }
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "delete_no" => {
            ctx.ui.with(chat_id, |ui| {
                match ui.session.clone().filter(|n| ctx.registry.has_session(n)) {
                    Some(name) => {
                        ui.mode = Mode::Session;
                        ui.session = Some(name);
                    }
                    None => ui.mode = Mode::Sessions,
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "delete_yes" => {
            let session = ctx
                .ui
                .with(chat_id, |ui| ui.session.clone())
                .filter(|n| ctx.registry.has_session(n));
            match session {
                Some(name) => {
                    let message = match ctx.registry.delete_session(&name).await {
                        Ok(outcome) => outcome.message().to_string(),
                        Err(e) => e.to_string(),
                    };
                    ctx.ui.with(chat_id, |ui| {
                        if ctx.registry.has_session(&name) {
                            ui.mode = Mode::Session;
                            ui.session = Some(name.clone());
                        } else {
                            ui.mode = Mode::Sessions;
                        }
                        ui.set_notice(message);
                    });
                }
                None => ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::Sessions;
                    ui.set_notice("No session selected.");
                }),
            }
            render_and_sync(ctx, chat_id).await;
        }

        "mkdir_no" => {
            ctx.ui.with(chat_id, |ui| {
                ui.mkdir = None;
                if !ui.pop() {
                    ui.mode = Mode::Sessions;
                }
            });
            render_and_sync(ctx, chat_id).await;
        }

        "mkdir_yes" => {
            on_mkdir_yes(ctx, chat_id).await;
        }

        "clear" => {
            let session = ctx
                .ui
                .with(chat_id, |ui| ui.session.clone())
                .filter(|n| ctx.registry.has_session(n));
            match session {
                Some(name) => match ctx.registry.clear_session(&name).await {
                    Ok(()) => ctx.ui.with(chat_id, |ui| {
                        ui.mode = Mode::Session;
                        ui.session = Some(name.clone());
                        ui.set_notice("Cleared.");
                    }),
                    Err(e) => ctx.ui.with(chat_id, |ui| ui.set_notice(e.to_string())),
                },
                None => ctx.ui.with(chat_id, |ui| {
                    ui.mode = Mode::Sessions;
                    ui.set_notice("No session selected.");
                }),
            }
            render_and_sync(ctx, chat_id).await;
        }

        "stop" => {
            on_stop_request(ctx, chat_id, message_id, ui_session.clone()).await;
        }

        "interrupt" | "stop_yes" => {
            on_stop_confirmed(ctx, chat_id, message_id, ui_session.clone()).await;
        }

        "stop_no" => {
            let name = resolve_session_for_callback_message(
                &ctx.registry,
                chat_id,
                Some(message_id),
                ui_session.clone(),
            );
            if let Some(name) = name {
                if ctx.registry.is_running(&name) {
                    if let Some(run) = ctx.registry.run(&name) {
                        // Back out of the in-stream confirmation.
                        run.set_confirm_stop(false);
                        run.stream.set_header("", 0);
                        run.stream
                            .set_reply_markup(Some(tether_engine::running_keyboard()));
                        run.stream.resume();
                        return;
                    }
                }
            }
            ctx.ui.with(chat_id, |ui| ui.set_notice("Not running."));
            render_and_sync(ctx, chat_id).await;
        }

        _ => {
            ctx.ui.with(chat_id, |ui| {
                ui.mode = Mode::Sessions;
                ui.set_notice("Unknown action.");
            });
            render_and_sync(ctx, chat_id).await;
        }
    }

    // A button tapped on a stale message (not the panel, not a live run
    // message) leaves junk behind; clean it up.
    if let Some(current_panel) = ctx.registry.panel_message_id(chat_id) {
        if message_id != current_panel
            && ctx
                .registry
                .resolve_session_for_run_message(chat_id, message_id)
                .is_none()
        {
            ctx.panel.delete_message_best_effort(chat_id, message_id).await;
        }
    }
}

async fn on_restart(ctx: &Arc<BotCtx>, chat_id: i64) {
    let any_running = ctx
        .registry
        .sessions_sorted()
        .iter()
        .any(|rec| ctx.registry.is_running(&rec.name));
    if any_running {
        ctx.ui.with(chat_id, |ui| {
            ui.set_notice("Stop all running sessions before restarting the bot.")
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }

    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::Sessions;
        ui.set_notice("Restarting…");
    });
    render_and_sync(ctx, chat_id).await;

    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        ctx.restart.notify_one();
    });
}

async fn on_path_pick(ctx: &Arc<BotCtx>, chat_id: i64, arg: Option<&str>) {
    let draft_name = ctx.ui.with(chat_id, |ui| {
        ui.new_draft.as_ref().and_then(|d| d.name.clone())
    });
    let Some(name) = draft_name else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::NewName;
            ui.set_notice("Missing draft name. Start again.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };

    let idx: i64 = arg.and_then(|a| a.parse().ok()).unwrap_or(-1);
    let preset = usize::try_from(idx)
        .ok()
        .and_then(|i| ctx.registry.path_presets().get(i).cloned());
    let Some(preset) = preset else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::NewPath;
            ui.set_notice("Invalid preset index.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };

    match tether_core::resolve_path(&preset) {
        Ok(resolved) if resolved.is_dir() => {
            create_session_and_focus(ctx, chat_id, &name, &resolved.display().to_string()).await;
        }
        Ok(resolved) => {
            ctx.ui.with(chat_id, |ui| {
                ui.mode = Mode::NewPath;
                ui.set_notice("Directory not found.");
                ui.notice_code = Some(resolved.display().to_string());
            });
            render_and_sync(ctx, chat_id).await;
        }
        Err(e) => {
            ctx.ui.with(chat_id, |ui| {
                ui.mode = Mode::NewPath;
                ui.set_notice(e.to_string());
                ui.notice_code = Some(preset.clone());
            });
            render_and_sync(ctx, chat_id).await;
        }
    }
}

async fn on_mkdir_yes(ctx: &Arc<BotCtx>, chat_id: i64) {
    let mkdir = ctx.ui.with(chat_id, |ui| ui.mkdir.clone());
    let Some(draft) = mkdir else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No pending directory to create.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };

    if let Err(e) = try_mkdir(&draft.path) {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::ConfirmMkdir;
            ui.set_notice(format!("Failed to create directory: {e}"));
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }

    match draft.flow {
        MkdirFlow::NewPath => {
            let draft_name = ctx.ui.with(chat_id, |ui| {
                ui.new_draft.as_ref().and_then(|d| d.name.clone())
            });
            let Some(name) = draft_name else {
                ctx.ui.with(chat_id, |ui| {
                    ui.mkdir = None;
                    ui.mode = Mode::NewName;
                    ui.set_notice("Missing draft name. Start again.");
                });
                render_and_sync(ctx, chat_id).await;
                return;
            };
            create_session_and_focus(ctx, chat_id, &name, &draft.path).await;
        }
        MkdirFlow::PathsAdd => {
            ctx.registry.upsert_path_preset(&draft.path).await;
            ctx.ui.with(chat_id, |ui| {
                ui.mkdir = None;
                ui.mode = Mode::Paths;
                ui.set_notice("Added.");
            });
            render_and_sync(ctx, chat_id).await;
        }
    }
}

/// `stop`: ask before interrupting. Attached running streams get the
/// in-stream confirmation; otherwise the confirm screen is shown.
async fn on_stop_request(
    ctx: &Arc<BotCtx>,
    chat_id: i64,
    message_id: i64,
    ui_session: Option<String>,
) {
    let name = resolve_session_for_callback_message(
        &ctx.registry,
        chat_id,
        Some(message_id),
        ui_session,
    );
    let Some(name) = name.filter(|n| ctx.registry.is_running(n)) else {
        ctx.ui.with(chat_id, |ui| ui.set_notice("Not running."));
        render_and_sync(ctx, chat_id).await;
        return;
    };

    if let (Some(run), Some(rec)) = (ctx.registry.run(&name), ctx.registry.session(&name)) {
        if !run.is_paused() {
            run.set_confirm_stop(true);
            run.stream.set_header(
                &build_running_header_html(&rec, Some(STOP_CONFIRM_QUESTION)),
                build_running_header_plain_len(&rec, Some(STOP_CONFIRM_QUESTION)),
            );
            run.stream.set_reply_markup(Some(stop_confirm_keyboard()));
            return;
        }
    }

    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::ConfirmStop;
        ui.session = Some(name.clone());
    });
    render_and_sync(ctx, chat_id).await;
}

/// `interrupt` / `stop_yes`: actually stop the run.
async fn on_stop_confirmed(
    ctx: &Arc<BotCtx>,
    chat_id: i64,
    message_id: i64,
    ui_session: Option<String>,
) {
    let name = resolve_session_for_callback_message(
        &ctx.registry,
        chat_id,
        Some(message_id),
        ui_session,
    );
    let Some(name) = name.filter(|n| ctx.registry.is_running(n)) else {
        ctx.ui.with(chat_id, |ui| ui.set_notice("Not running."));
        render_and_sync(ctx, chat_id).await;
        return;
    };

    let paused = ctx
        .registry
        .run(&name)
        .map(|run| run.is_paused())
        .unwrap_or(false);
    ctx.registry.stop(&name).await;

    if paused {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Session;
            ui.session = Some(name.clone());
            ui.set_notice("Stop requested…");
        });
        render_and_sync(ctx, chat_id).await;
    }
    // When the stream is attached, the runner's final flush and completion
    // notice tell the story; nothing to render here.
}
