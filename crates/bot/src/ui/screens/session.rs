// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session detail and log screens, plus the running-stream header bits
//! shared with the attach bridge.

use tether_adapters::{InlineKeyboardButton, InlineKeyboardMarkup};
use tether_core::{
    cb, escape_html, format_duration, tail_text, truncate_text, LastResult, SessionRecord,
    SessionStatus, MAX_MESSAGE_CHARS,
};
use tether_engine::{
    extract_last_agent_message, preview_from_stderr_log, preview_from_stdout_log, Registry,
    RUN_START_WAIT_NOTE,
};

use super::{notice_html, render_sessions_list, Screen, LABEL_BACK};

/// Question shown in the in-stream stop confirmation.
pub const STOP_CONFIRM_QUESTION: &str = "Are you sure you want to stop this run?";

/// Raw (pre-truncation) budget when replaying logs for screens.
const RAW_PREVIEW_BUDGET: usize = 100_000;

pub fn status_emoji(rec: &SessionRecord) -> &'static str {
    if rec.status == SessionStatus::Running {
        return "🟢";
    }
    if rec.last_result == LastResult::Success && rec.status == SessionStatus::Idle {
        return "✅";
    }
    if rec.status == SessionStatus::Stopped || rec.last_result == LastResult::Stopped {
        return "⏹";
    }
    if rec.status == SessionStatus::Error || rec.last_result == LastResult::Error {
        return "❌";
    }
    if rec.last_result == LastResult::Never {
        return "🆕";
    }
    "⚪️"
}

fn compact_info(rec: &SessionRecord) -> String {
    format!(
        "<code>{}</code> <code>{}</code>\n<code>{}</code>",
        escape_html(&rec.model),
        escape_html(rec.reasoning_effort.as_str()),
        escape_html(&rec.path),
    )
}

fn running_header_plain(rec: &SessionRecord, note: Option<&str>) -> String {
    let mut lines = vec![
        format!("Session: {}", rec.name),
        format!("Path: {}", rec.path),
        format!("Model: {}", rec.model),
        format!("Reasoning effort: {}", rec.reasoning_effort),
        format!("Status: {}", rec.status),
    ];
    if let Some(note) = note {
        lines.push(note.to_string());
    }
    lines.join("\n")
}

/// Header installed on a stream when the stop confirmation (or another
/// note) replaces the live view's empty header.
pub fn build_running_header_html(rec: &SessionRecord, note: Option<&str>) -> String {
    let note_line = note
        .map(|n| format!("\n<i>{}</i>", escape_html(n)))
        .unwrap_or_default();
    format!(
        "<b>Session:</b> <code>{}</code>\n<b>Path:</b> <code>{}</code>\n<b>Model:</b> <code>{}</code>\n<b>Reasoning effort:</b> <code>{}</code>\n<b>Status:</b> {}{}",
        escape_html(&rec.name),
        escape_html(&rec.path),
        escape_html(&rec.model),
        escape_html(rec.reasoning_effort.as_str()),
        escape_html(rec.status.as_str()),
        note_line,
    )
}

pub fn build_running_header_plain_len(rec: &SessionRecord, note: Option<&str>) -> usize {
    running_header_plain(rec, note).chars().count()
}

pub fn stop_confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("✅ Yes, stop", cb(&["stop_yes"])),
        InlineKeyboardButton::new("❌ No", cb(&["stop_no"])),
    ]])
}

fn session_keyboard(never_ran: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if never_ran {
        rows.push(vec![InlineKeyboardButton::new("⚙️", cb(&["model"]))]);
    } else {
        rows.push(vec![
            InlineKeyboardButton::new("🆕", cb(&["clear"])),
            InlineKeyboardButton::new("⚙️", cb(&["model"])),
        ]);
    }
    rows.push(vec![
        InlineKeyboardButton::new(LABEL_BACK, cb(&["back"])),
        InlineKeyboardButton::new("🗑", cb(&["delete"])),
    ]);
    InlineKeyboardMarkup::new(rows)
}

pub fn render_session_view(registry: &Registry, name: &str, notice: Option<&str>) -> Screen {
    let Some(rec) = registry.session(name) else {
        let mut scratch = crate::ui::state::UiState::default();
        return render_sessions_list(
            registry,
            &mut scratch,
            Some(&format!("Unknown session: {name}")),
        );
    };

    // Live view: frozen tail of the current run plus the working timer.
    if registry.is_running(name) {
        if let Some(run) = registry.run(name) {
            let raw =
                preview_from_stdout_log(rec.last_stdout_log.as_deref(), RAW_PREVIEW_BUDGET);
            let log_tail = tail_text(raw.trim(), 3200);
            let start_note = if log_tail.is_empty() {
                format!("<i>{}</i>\n\n", escape_html(RUN_START_WAIT_NOTE))
            } else {
                String::new()
            };
            let elapsed = format_duration(run.elapsed().as_secs());
            let text_html = format!(
                "{}{}<pre><code>{}</code></pre>\n\n<code>---- Working {} ----</code>",
                notice_html(notice),
                start_note,
                escape_html(&log_tail),
                escape_html(&elapsed),
            );
            return (text_html, tether_engine::running_keyboard());
        }
    }

    if rec.never_ran() {
        let text_html = format!(
            "{}{}\n\n<i>Send a prompt to start.</i>",
            notice_html(notice),
            compact_info(&rec),
        );
        return (text_html, session_keyboard(true));
    }

    // Finished view: log preview, status line, last agent message.
    let stdout_plain = preview_from_stdout_log(rec.last_stdout_log.as_deref(), RAW_PREVIEW_BUDGET);
    let stderr_plain = preview_from_stderr_log(rec.last_stderr_log.as_deref(), RAW_PREVIEW_BUDGET);
    let log_plain = if !stdout_plain.trim().is_empty() {
        stdout_plain.trim().to_string()
    } else if !stderr_plain.trim().is_empty() {
        stderr_plain.trim().to_string()
    } else {
        "(empty)".to_string()
    };

    let duration_label = format_duration(rec.last_run_duration_s.unwrap_or(0));
    let status_line = if rec.last_result == LastResult::Stopped
        || rec.status == SessionStatus::Stopped
    {
        format!("<code>---- Stopped after {} ----</code>", escape_html(&duration_label))
    } else if rec.last_result == LastResult::Error || rec.status == SessionStatus::Error {
        format!("<code>---- Failed after {} ----</code>", escape_html(&duration_label))
    } else {
        format!("<code>---- Worked for {} ----</code>", escape_html(&duration_label))
    };

    let result_plain = extract_last_agent_message(rec.last_stdout_log.as_deref(), RAW_PREVIEW_BUDGET)
        .trim()
        .to_string();

    let notice_part = notice_html(notice);
    let info = compact_info(&rec);

    let mut log_max = 2600usize;
    let mut result_max = 1400usize;
    let mut text_html = String::new();
    for _ in 0..10 {
        let log_tail = tail_text(&log_plain, log_max);
        let result_view = if result_plain.chars().count() > result_max {
            truncate_text(&result_plain, result_max)
        } else {
            result_plain.clone()
        };
        let result_html = if result_view.is_empty() {
            String::new()
        } else if result_view.contains('\n') {
            format!("<pre><code>{}</code></pre>", escape_html(&result_view))
        } else {
            escape_html(&result_view)
        };

        let mut parts: Vec<String> = Vec::new();
        if !notice_part.trim().is_empty() {
            parts.push(notice_part.trim_end().to_string());
        }
        parts.push(format!("<pre><code>{}</code></pre>", escape_html(&log_tail)));
        parts.push(info.clone());
        parts.push(status_line.clone());
        if !result_html.is_empty() {
            parts.push(result_html);
        }
        parts.push("Send a prompt to continue.".to_string());

        text_html = parts.join("\n\n");
        if text_html.chars().count() <= MAX_MESSAGE_CHARS {
            break;
        }
        if log_max > 900 {
            log_max = ((log_max * 4) / 5).max(900);
            continue;
        }
        if result_max > 300 {
            result_max = ((result_max * 4) / 5).max(300);
            continue;
        }
        break;
    }

    (text_html, session_keyboard(false))
}

pub fn render_logs_view(registry: &Registry, name: &str, notice: Option<&str>) -> Screen {
    let Some(rec) = registry.session(name) else {
        let mut scratch = crate::ui::state::UiState::default();
        return render_sessions_list(
            registry,
            &mut scratch,
            Some(&format!("Unknown session: {name}")),
        );
    };

    let mut last_msg = extract_last_agent_message(rec.last_stdout_log.as_deref(), 3200);
    if last_msg.is_empty() {
        last_msg = preview_from_stdout_log(rec.last_stdout_log.as_deref(), 3200);
    }
    if last_msg.is_empty() {
        last_msg = "(empty)".to_string();
    }

    let text_html = format!(
        "{}<b>Log</b> <code>{}</code>\n\n{}\n\n<pre><code>{}</code></pre>",
        notice_html(notice),
        escape_html(&rec.name),
        compact_info(&rec),
        escape_html(&last_msg),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::new(
        LABEL_BACK,
        cb(&["back"]),
    )]]);
    (text_html, kb)
}
