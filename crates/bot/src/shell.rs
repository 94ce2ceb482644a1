// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shell: long-poll loop, update dispatch, signal-driven shutdown, and
//! the in-process restart gate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tether_adapters::{
    discover_model_presets, ChatTransport, TelegramApi, Update, UpdatePoller,
};
use tether_engine::{PanelSync, Registry};
use tether_storage::{maybe_migrate_runtime_files, StateStore};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::ctx::BotCtx;
use crate::handlers::{attachments, callback, commands, text};
use crate::ui::screens;

/// Pause after a failed `getUpdates` before polling again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// How the shell exited.
pub struct RunOutcome {
    /// The core requested an in-process restart; the caller re-executes the
    /// image.
    pub restart_requested: bool,
}

/// Post-run panel rendering injected into the engine. The engine signals
/// run completion; the UI layer owns what a "finished session" looks like.
struct PanelBridge {
    ctx: Arc<BotCtx>,
}

#[async_trait]
impl PanelSync for PanelBridge {
    async fn render_session_panel(
        &self,
        chat_id: i64,
        message_id: i64,
        session_name: &str,
        notice: Option<&str>,
    ) {
        let (text_html, markup) =
            screens::render_session_view(&self.ctx.registry, session_name, notice);
        self.ctx
            .panel
            .render_to_message(chat_id, message_id, &text_html, Some(&markup), true)
            .await;
    }
}

/// Run the bot until shutdown or a restart request.
pub async fn run_bot(config: Config) -> anyhow::Result<RunOutcome> {
    maybe_migrate_runtime_files(&config.paths);

    let api = TelegramApi::new(config.token.clone());
    let transport: Arc<dyn ChatTransport> = Arc::new(api.clone());
    let store = StateStore::new(config.paths.clone());
    let registry = Registry::new(store, transport, config.admin_id);
    let model_presets = discover_model_presets();

    let ctx = BotCtx::new(registry.clone(), model_presets);
    registry.set_panel_sync(Arc::new(PanelBridge {
        ctx: Arc::clone(&ctx),
    }));

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut poller = UpdatePoller::new(api);

    info!(
        state = %config.paths.state_path.display(),
        sessions = registry.sessions_sorted().len(),
        "bot ready, polling for updates",
    );

    let restart_requested = loop {
        tokio::select! {
            batch = poller.next_batch() => {
                match batch {
                    Ok(updates) => {
                        for update in updates {
                            handle_update(&ctx, update).await;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "update poll failed; retrying");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break false;
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break false;
            }

            _ = ctx.restart.notified() => {
                info!("restart requested");
                break true;
            }
        }
    };

    registry.shutdown().await;
    info!("bot stopped");
    Ok(RunOutcome { restart_requested })
}

/// Route one update. Handlers log their own failures; one bad update never
/// takes the loop down.
pub async fn handle_update(ctx: &Arc<BotCtx>, update: Update) {
    if let Some(query) = &update.callback_query {
        callback::on_callback(ctx, query).await;
        return;
    }

    let Some(message) = &update.message else {
        return;
    };

    if message.has_attachment() {
        attachments::on_attachment(ctx, message).await;
        return;
    }

    let text = message.text.as_deref().unwrap_or("");
    if let Some(command) = command_name(text) {
        match command.as_str() {
            "start" => commands::cmd_start(ctx, message).await,
            "menu" => commands::cmd_menu(ctx, message).await,
            "new" => commands::cmd_new(ctx, message).await,
            "use" => commands::cmd_use(ctx, message).await,
            "list" => commands::cmd_list(ctx, message).await,
            "logs" => commands::cmd_logs(ctx, message).await,
            "stop" => commands::cmd_stop(ctx, message).await,
            other => {
                error!(command = other, "unknown command");
                text::on_unknown_command(ctx, message).await;
            }
        }
        return;
    }

    text::on_text(ctx, message).await;
}

/// `/cmd@botname args` → `cmd`; `None` for non-command text.
fn command_name(text: &str) -> Option<String> {
    let first = text.trim_start().split_whitespace().next()?;
    let stripped = first.strip_prefix('/')?;
    let name = stripped.split('@').next().unwrap_or(stripped);
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
