// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-text input, routed by the chat's current mode.

use std::path::Path;
use std::sync::Arc;

use tether_adapters::Message;
use tether_core::{can_create_directory, resolve_path, safe_session_name, RunMode};
use tracing::warn;

use crate::ctx::BotCtx;
use crate::render::render_and_sync;
use crate::ui::state::{MkdirDraft, MkdirFlow, Mode, NewDraft};

use super::{delete_user_message_best_effort, ensure_authorized};

/// Start a run in the background and refresh the UI once it resolves.
///
/// `ui_mode` decides the follow-up: prompts from the session view run
/// silently (the runner re-renders the panel), prompts from the await-prompt
/// screen flip the chat into the session view first and leave a "finished"
/// notice after.
pub(crate) async fn schedule_prompt_run(
    ctx: &Arc<BotCtx>,
    chat_id: i64,
    session_name: &str,
    prompt: &str,
    ui_mode: Mode,
    run_mode: RunMode,
) {
    if prompt.trim().is_empty() {
        return;
    }
    if !ctx.registry.has_session(session_name) {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }
    if ctx.registry.is_running(session_name) {
        return;
    }

    match ui_mode {
        Mode::Session => {
            spawn_run(ctx, chat_id, session_name, prompt, RunMode::Continue, false);
        }
        Mode::AwaitPrompt => {
            ctx.ui.with(chat_id, |ui| {
                let prior = ui.notice.take().map(|n| n.trim().to_string());
                let base = "Starting… (see output message below)".to_string();
                let notice = match prior {
                    Some(p) if !p.is_empty() && p != base => format!("{p}\n\n{base}"),
                    _ => base,
                };
                ui.set(ui
                    .snapshot()
                    .with_mode(Mode::Session)
                    .with_session(Some(session_name.to_string())));
                ui.set_notice(notice);
            });
            render_and_sync(ctx, chat_id).await;
            spawn_run(ctx, chat_id, session_name, prompt, run_mode, true);
        }
        _ => {}
    }
}

fn spawn_run(
    ctx: &Arc<BotCtx>,
    chat_id: i64,
    session_name: &str,
    prompt: &str,
    run_mode: RunMode,
    refresh_after: bool,
) {
    let ctx = Arc::clone(ctx);
    let session_name = session_name.to_string();
    let prompt = prompt.to_string();
    tokio::spawn(async move {
        let panel_id = match ctx.panel.ensure_panel(chat_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(chat_id, error = %e, "run aborted: no panel");
                return;
            }
        };
        ctx.registry
            .run_prompt(chat_id, panel_id, &session_name, &prompt, run_mode)
            .await;

        if refresh_after {
            ctx.ui.with(chat_id, |ui| match ui.mode {
                Mode::AwaitPrompt => {
                    if ctx.registry.has_session(&session_name) {
                        ui.set(ui
                            .snapshot()
                            .with_mode(Mode::Session)
                            .with_session(Some(session_name.clone())));
                    } else {
                        ui.mode = Mode::Sessions;
                    }
                    ui.set_notice("Run finished.");
                }
                Mode::Session if ui.session.as_deref() == Some(session_name.as_str()) => {
                    ui.set_notice("Run finished.");
                }
                _ => ui.set_notice(format!("Run finished: {session_name}")),
            });
        }
    });
}

pub async fn on_text(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    let text = message.text.clone().unwrap_or_default().trim().to_string();

    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;
    if text.is_empty() {
        return;
    }

    let mode = ctx.ui.with(chat_id, |ui| ui.mode);
    match mode {
        Mode::NewName => on_new_name(ctx, chat_id, &text).await,
        Mode::NewPath => on_new_path(ctx, chat_id, &text).await,
        Mode::PathsAdd => on_paths_add(ctx, chat_id, &text).await,
        Mode::ModelCustom => on_model_custom(ctx, chat_id, &text).await,
        Mode::Session => on_session_prompt(ctx, chat_id, &text).await,
        Mode::AwaitPrompt => on_await_prompt(ctx, chat_id, &text).await,
        _ => render_and_sync(ctx, chat_id).await,
    }
}

async fn on_new_name(ctx: &Arc<BotCtx>, chat_id: i64, text: &str) {
    let Some(safe) = safe_session_name(text) else {
        ctx.ui.with(chat_id, |ui| {
            ui.set_notice("Invalid name. Allowed: a-zA-Z0-9._- (<=64).")
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };
    if ctx.registry.has_session(&safe) {
        ctx.ui
            .with(chat_id, |ui| ui.set_notice("A session with this name already exists."));
        render_and_sync(ctx, chat_id).await;
        return;
    }
    ctx.ui.with(chat_id, |ui| {
        let target = ui
            .snapshot()
            .with_mode(Mode::NewPath)
            .with_new_draft(Some(NewDraft { name: Some(safe) }));
        ui.go(target);
    });
    render_and_sync(ctx, chat_id).await;
}

async fn on_new_path(ctx: &Arc<BotCtx>, chat_id: i64, text: &str) {
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

    let resolved = match resolve_path(text) {
        Ok(p) => p,
        Err(e) => {
            ctx.ui.with(chat_id, |ui| {
                ui.set_notice(e.to_string());
                ui.notice_code = Some(text.to_string());
            });
            render_and_sync(ctx, chat_id).await;
            return;
        }
    };
    let abs_path = resolved.display().to_string();
    ctx.ui.with(chat_id, |ui| ui.mkdir = None);

    if resolved.exists() && !resolved.is_dir() {
        ctx.ui.with(chat_id, |ui| {
            ui.set_notice("Not a directory.");
            ui.notice_code = Some(abs_path.clone());
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }
    if !resolved.exists() {
        if can_create_directory(&resolved) {
            ctx.ui.with(chat_id, |ui| {
                ui.mkdir = Some(MkdirDraft {
                    path: abs_path.clone(),
                    flow: MkdirFlow::NewPath,
                });
                let target = ui.snapshot().with_mode(Mode::ConfirmMkdir);
                ui.go(target);
            });
        } else {
            ctx.ui.with(chat_id, |ui| {
                ui.set_notice("Directory not found.");
                ui.notice_code = Some(abs_path.clone());
            });
        }
        render_and_sync(ctx, chat_id).await;
        return;
    }

    create_session_and_focus(ctx, chat_id, &name, &abs_path).await;
}

/// Shared tail of the wizard: create, reset navigation, focus the session.
pub(crate) async fn create_session_and_focus(
    ctx: &Arc<BotCtx>,
    chat_id: i64,
    name: &str,
    path: &str,
) {
    match ctx.registry.create_session(name, path).await {
        Ok(rec) => {
            ctx.ui.with(chat_id, |ui| {
                ui.new_draft = None;
                ui.mkdir = None;
                ui.nav_reset_to(ui.snapshot().with_mode(Mode::Sessions).with_session(None));
                ui.set(ui
                    .snapshot()
                    .with_mode(Mode::Session)
                    .with_session(Some(rec.name.clone()))
                    .with_new_draft(None));
            });
        }
        Err(e) => {
            ctx.ui.with(chat_id, |ui| {
                ui.mode = Mode::NewPath;
                ui.new_draft = Some(NewDraft {
                    name: Some(name.to_string()),
                });
                ui.set_notice(e.to_string());
            });
        }
    }
    render_and_sync(ctx, chat_id).await;
}

async fn on_paths_add(ctx: &Arc<BotCtx>, chat_id: i64, text: &str) {
    let resolved = match resolve_path(text) {
        Ok(p) => p,
        Err(e) => {
            ctx.ui.with(chat_id, |ui| {
                ui.set_notice(e.to_string());
                ui.notice_code = Some(text.to_string());
            });
            render_and_sync(ctx, chat_id).await;
            return;
        }
    };
    let abs_path = resolved.display().to_string();
    ctx.ui.with(chat_id, |ui| ui.mkdir = None);

    if resolved.exists() && !resolved.is_dir() {
        ctx.ui.with(chat_id, |ui| {
            ui.set_notice("Not a directory.");
            ui.notice_code = Some(abs_path.clone());
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }
    if !resolved.exists() {
        if can_create_directory(&resolved) {
            ctx.ui.with(chat_id, |ui| {
                ui.mkdir = Some(MkdirDraft {
                    path: abs_path.clone(),
                    flow: MkdirFlow::PathsAdd,
                });
                let target = ui.snapshot().with_mode(Mode::ConfirmMkdir);
                ui.go(target);
            });
        } else {
            ctx.ui.with(chat_id, |ui| {
                ui.set_notice("Directory not found.");
                ui.notice_code = Some(abs_path.clone());
            });
        }
        render_and_sync(ctx, chat_id).await;
        return;
    }

    ctx.registry.upsert_path_preset(&abs_path).await;
    ctx.ui.with(chat_id, |ui| {
        ui.mode = Mode::Paths;
        ui.set_notice("Added.");
    });
    render_and_sync(ctx, chat_id).await;
}

async fn on_model_custom(ctx: &Arc<BotCtx>, chat_id: i64, text: &str) {
    let session = ctx.ui.with(chat_id, |ui| ui.session.clone());
    let Some(name) = session.filter(|n| ctx.registry.has_session(n)) else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };

    let model = text.trim().to_string();
    if model.is_empty() {
        ctx.ui
            .with(chat_id, |ui| ui.set_notice("Model id can't be empty."));
        render_and_sync(ctx, chat_id).await;
        return;
    }

    ctx.registry.set_model(&name, &model).await;
    ctx.ui.with(chat_id, |ui| {
        ui.set_notice(format!("Model: {model}"));
        if !ui.pop() {
            ui.set(ui
                .snapshot()
                .with_mode(Mode::Session)
                .with_session(Some(name.clone())));
        }
    });
    render_and_sync(ctx, chat_id).await;
}

async fn on_session_prompt(ctx: &Arc<BotCtx>, chat_id: i64, text: &str) {
    let session = ctx.ui.with(chat_id, |ui| ui.session.clone());
    let Some(name) = session.filter(|n| ctx.registry.has_session(n)) else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };
    if ctx.registry.is_running(&name) {
        return;
    }
    schedule_prompt_run(ctx, chat_id, &name, text, Mode::Session, RunMode::Continue).await;
}

async fn on_await_prompt(ctx: &Arc<BotCtx>, chat_id: i64, text: &str) {
    let (session, run_mode) = ctx.ui.with(chat_id, |ui| {
        (
            ui.session.clone(),
            ui.await_prompt.map(|a| a.run_mode).unwrap_or(RunMode::New),
        )
    });
    let Some(name) = session.filter(|n| ctx.registry.has_session(n)) else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };
    if ctx.registry.is_running(&name) {
        ctx.ui.with(chat_id, |ui| {
            ui.set(ui
                .snapshot()
                .with_mode(Mode::Session)
                .with_session(Some(name.clone())));
            ui.set_notice("This session is already running.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    }

    schedule_prompt_run(ctx, chat_id, &name, text, Mode::AwaitPrompt, run_mode).await;
}

pub async fn on_unknown_command(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;
    render_and_sync(ctx, chat_id).await;
}

/// Create the directory confirmed on the mkdir screen; used by the callback
/// handler.
pub(crate) fn try_mkdir(path: &str) -> Result<(), String> {
    std::fs::create_dir_all(path).map_err(|e| e.to_string())?;
    let p = Path::new(path);
    if !p.is_dir() {
        return Err("not a directory after mkdir".to_string());
    }
    Ok(())
}
