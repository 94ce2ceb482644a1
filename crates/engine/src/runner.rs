// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run subprocess lifecycle: spawn the agent CLI in its own process
//! group, feed its pipes through the decoder into the stream, classify the
//! outcome, and clean up.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tether_adapters::{
    build_codex_cmd, detect_git_dir, InlineKeyboardButton, InlineKeyboardMarkup,
};
use tether_core::{
    cb, escape_html, format_duration, log_stamp, now_iso, LastResult, RunMode, SessionStatus,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::events::apply_agent_event;
use crate::log_sink::LogSink;
use crate::notice::send_completion_notice;
use crate::registry::{Registry, RunHandle};
use crate::stream::{Stream, StreamConfig};

/// Header shown while the agent is still warming up.
pub const RUN_START_WAIT_NOTE: &str = "The request has been sent. During startup (especially for larger models), the first logs may appear after about one minute — please wait…";

/// Footer sample used to budget the working timer line.
const WORKING_FOOTER_SAMPLE: &str = "---- Working 0m 0s ----";

/// Keyboard shown under a live stream: detach and interrupt.
pub fn running_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("⬅️", cb(&["detach"])),
        InlineKeyboardButton::new("⛔", cb(&["interrupt"])),
    ]])
}

/// The working-timer footer provider for a run that started at `started`.
pub fn working_footer(started: Instant) -> crate::stream::FooterProvider {
    Box::new(move || {
        format!(
            "<code>---- Working {} ----</code>",
            escape_html(&format_duration(started.elapsed().as_secs()))
        )
    })
}

/// Plain length reserved for the working footer.
pub fn working_footer_plain_len() -> usize {
    WORKING_FOOTER_SAMPLE.chars().count()
}

impl Registry {
    /// Execute one prompt for a session, editing the given panel message as
    /// the output stream. Returns when the run has fully resolved.
    pub async fn run_prompt(
        &self,
        chat_id: i64,
        panel_message_id: i64,
        session_name: &str,
        prompt: &str,
        run_mode: RunMode,
    ) {
        let Some(rec) = self.session(session_name) else {
            return;
        };
        if self.run(session_name).map(|r| r.is_alive()).unwrap_or(false) {
            return;
        }

        if run_mode == RunMode::New {
            self.update_session(session_name, |rec| rec.thread_id = None);
            self.save_state().await;
        }

        let log_dir = self.paths().log_dir;
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            warn!(dir = %log_dir.display(), error = %e, "failed to create log dir");
        }
        let stamp = log_stamp();
        let stdout_log = log_dir.join(format!("{session_name}_{stamp}.jsonl"));
        let stderr_log = log_dir.join(format!("{session_name}_{stamp}.stderr.txt"));

        self.update_session(session_name, |rec| {
            rec.status = SessionStatus::Running;
            rec.last_active = Some(now_iso());
            rec.last_stdout_log = Some(stdout_log.display().to_string());
            rec.last_stderr_log = Some(stderr_log.display().to_string());
            rec.last_run_duration_s = None;
        });
        self.save_state().await;

        let started = Instant::now();

        self.pause_other_attached_runs(chat_id, panel_message_id, Some(session_name));
        self.register_run_message(chat_id, panel_message_id, session_name);

        let stream = Stream::spawn(
            self.transport(),
            chat_id,
            panel_message_id,
            StreamConfig {
                header_html: format!("<i>{}</i>", escape_html(RUN_START_WAIT_NOTE)),
                header_plain_len: RUN_START_WAIT_NOTE.chars().count(),
                auto_clear_header_on_first_log: true,
                footer: Some(working_footer(started)),
                footer_plain_len: working_footer_plain_len(),
                wrap_log_in_pre: true,
                reply_markup: Some(running_keyboard()),
            },
        );

        // The command captures the record after the optional thread reset.
        let rec_for_cmd = self.session(session_name).unwrap_or(rec);
        let git_dir = detect_git_dir(std::path::Path::new(&rec_for_cmd.path)).await;
        let cmd = build_codex_cmd(&rec_for_cmd, prompt, run_mode, git_dir.as_deref());

        info!(
            session = session_name,
            chat_id,
            message_id = panel_message_id,
            command = %cmd.join(" "),
            "starting run",
        );

        let mut child = match spawn_in_new_group(&cmd) {
            Ok(child) => child,
            Err(e) => {
                let stderr_text = if e.kind() == std::io::ErrorKind::NotFound {
                    "`codex` not found in PATH.\n".to_string()
                } else {
                    format!("Failed to start Codex: {e}\n")
                };
                self.handle_start_failure(
                    chat_id,
                    panel_message_id,
                    session_name,
                    &stream,
                    &stderr_log,
                    &stderr_text,
                    started,
                )
                .await;
                return;
            }
        };

        let (exit_tx, exit_rx) = watch::channel(false);
        let run = Arc::new(RunHandle::new(
            Arc::clone(&stream),
            stdout_log.clone(),
            stderr_log.clone(),
            started,
            child.id(),
            exit_rx,
        ));
        self.insert_run(session_name, Arc::clone(&run));
        self.save_state().await;

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(read_stdout(
                self.clone(),
                session_name.to_string(),
                Arc::clone(&run),
                Arc::clone(&stream),
                stdout,
                stdout_log.clone(),
            ))
        });
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(read_stderr(Arc::clone(&run), stderr, stderr_log.clone()))
        });

        let exit_status = child.wait().await;
        let _ = exit_tx.send(true);
        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        let paused = stream.is_paused();
        let duration_s = started.elapsed().as_secs();
        let succeeded = exit_status.as_ref().map(|s| s.success()).unwrap_or(false);
        let (status, last_result) = if run.stop_requested() {
            (SessionStatus::Stopped, LastResult::Stopped)
        } else if succeeded {
            (SessionStatus::Idle, LastResult::Success)
        } else {
            (SessionStatus::Error, LastResult::Error)
        };

        info!(
            session = session_name,
            status = %status,
            duration_s,
            "run resolved",
        );

        self.update_session(session_name, |rec| {
            rec.status = status;
            rec.last_result = last_result;
            rec.last_run_duration_s = Some(duration_s);
            rec.last_active = Some(now_iso());
        });
        self.save_state().await;

        stream.stop().await;
        self.unregister_run_message(chat_id, stream.message_id());
        self.remove_run(session_name);
        self.save_state().await;

        if !paused {
            if let Some(panel) = self.panel_sync() {
                panel
                    .render_session_panel(chat_id, panel_message_id, session_name, None)
                    .await;
            }
        }

        let path = self
            .session(session_name)
            .map(|r| r.path)
            .unwrap_or_default();
        send_completion_notice(self.transport().as_ref(), chat_id, session_name, &path, prompt)
            .await;

        let pending_delete = self
            .session(session_name)
            .map(|r| r.pending_delete)
            .unwrap_or(false);
        if pending_delete {
            let _ = self.delete_session(session_name).await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_start_failure(
        &self,
        chat_id: i64,
        panel_message_id: i64,
        session_name: &str,
        stream: &Arc<Stream>,
        stderr_log: &Path,
        stderr_text: &str,
        started: Instant,
    ) {
        error!(session = session_name, detail = stderr_text, "failed to start run");

        if let Some(parent) = stderr_log.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(stderr_log, stderr_text) {
            warn!(path = %stderr_log.display(), error = %e, "failed to write start-failure log");
        }

        self.update_session(session_name, |rec| {
            rec.status = SessionStatus::Error;
            rec.last_result = LastResult::Error;
            rec.last_active = Some(now_iso());
            rec.last_run_duration_s = Some(started.elapsed().as_secs());
        });
        self.save_state().await;

        stream.stop().await;
        self.unregister_run_message(chat_id, stream.message_id());

        if let Some(panel) = self.panel_sync() {
            panel
                .render_session_panel(
                    chat_id,
                    panel_message_id,
                    session_name,
                    Some("Failed to start."),
                )
                .await;
        }
    }
}

/// Spawn the command in a fresh process group with both pipes captured, so
/// stop can signal the whole tree.
fn spawn_in_new_group(cmd: &[String]) -> std::io::Result<tokio::process::Child> {
    let Some((program, args)) = cmd.split_first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command",
        ));
    };
    let mut std_cmd = std::process::Command::new(program);
    std_cmd.args(args);
    {
        use std::os::unix::process::CommandExt;
        std_cmd.process_group(0);
    }
    let mut cmd = Command::from(std_cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);
    cmd.spawn()
}

/// Read stdout as binary-safe lines: JSON objects go through the decoder,
/// anything else flows verbatim into the stream. Every line lands in the
/// stdout log.
async fn read_stdout<R: AsyncRead + Unpin>(
    registry: Registry,
    session_name: String,
    run: Arc<RunHandle>,
    stream: Arc<Stream>,
    stdout: R,
    log_path: PathBuf,
) {
    let mut sink = LogSink::new(log_path);
    let mut reader = BufReader::new(stdout);
    let mut buf: Vec<u8> = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                warn!(session = session_name, error = %e, "stdout read failed");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }
        }

        let decoded = String::from_utf8_lossy(&buf).into_owned();
        sink.write_chunk(&decoded);

        let trimmed = decoded.trim();
        if trimmed.is_empty() {
            continue;
        }

        let obj = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) if value.is_object() => value,
            _ => {
                stream.add_text(&decoded);
                continue;
            }
        };

        let current_thread_id = registry
            .session(&session_name)
            .and_then(|rec| rec.thread_id);
        let discovered = {
            let mut last_cmd = run.last_cmd.lock();
            apply_agent_event(&stream, &obj, current_thread_id.as_deref(), &mut last_cmd)
        };
        if let Some(thread_id) = discovered {
            registry.set_thread_id(&session_name, thread_id).await;
        }
    }
}

/// Read stderr into its log and the bounded diagnostic ring.
async fn read_stderr<R: AsyncRead + Unpin>(run: Arc<RunHandle>, stderr: R, log_path: PathBuf) {
    let mut sink = LogSink::new(log_path);
    let mut reader = BufReader::new(stderr);
    let mut buf: Vec<u8> = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "stderr read failed");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }
        }
        let decoded = String::from_utf8_lossy(&buf).into_owned();
        sink.write_chunk(&decoded);
        run.push_stderr_line(decoded);
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
