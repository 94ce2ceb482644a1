// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tetherbot — single-user chat control plane for local Codex CLI sessions.
//!
//! The process long-polls the chat transport, dispatches updates into the
//! UI layer, and owns graceful shutdown. A restart request re-executes the
//! current image with the original argv.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::Path;

use tether_bot::{run_bot, Config};
use tracing::info;

/// Maximum bot log size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (bot.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    rotate_log_if_needed(&config.paths.bot_log_path);
    let log_guard = setup_logging(&config)?;

    info!("starting tetherbot");
    let outcome = run_bot(config).await?;

    if outcome.restart_requested {
        info!("restarting process image");
        drop(log_guard);
        restart_process()?;
    }
    Ok(())
}

/// Re-execute the current binary with the original arguments. Only returns
/// on failure.
fn restart_process() -> anyhow::Result<()> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe()?;
    let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
    let err = std::process::Command::new(exe).args(args).exec();
    Err(anyhow::anyhow!("exec failed: {err}"))
}

/// Rotate the bot log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `bot.log` → `bot.log.1` → `bot.log.2` → `bot.log.3`, deleting the
/// oldest. Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = &config.paths.bot_log_path;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let parent = log_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("bot log path has no parent directory"))?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("bot log path has no file name"))?;

    // Rotation happens at startup via rotate_log_if_needed.
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
