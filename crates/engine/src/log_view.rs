// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tail reads and preview rendering over persisted run logs.
//!
//! Previews replay the stdout line-JSON through the decoder so a finished
//! (or crashed-over) run shows the same shape the live stream showed, just
//! with tighter budgets.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde_json::Value;
use tether_core::{decode, get_event_type, truncate_text, AgentEvent};

/// How much of a log file tail reads consider.
pub const TAIL_MAX_BYTES: u64 = 64 * 1024;

/// Default character budget for previews.
pub const PREVIEW_MAX_CHARS: usize = 2400;

/// Lossy text of the last `max_bytes` of a file; empty on any error.
pub fn tail_text_file(path: &Path, max_bytes: u64) -> String {
    let Ok(mut file) = std::fs::File::open(path) else {
        return String::new();
    };
    let Ok(meta) = file.metadata() else {
        return String::new();
    };
    if !meta.is_file() {
        return String::new();
    }
    let size = meta.len();
    let to_read = size.min(max_bytes);
    if to_read < size && file.seek(SeekFrom::End(-(to_read as i64))).is_err() {
        return String::new();
    }
    let mut buf = Vec::with_capacity(to_read as usize);
    if file.take(to_read).read_to_end(&mut buf).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn parse_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(Value::is_object)
}

/// The last agent/assistant message text in the stdout log, if any.
pub fn extract_last_agent_message(path: Option<&str>, max_chars: usize) -> String {
    let Some(path) = path else {
        return String::new();
    };
    let raw = tail_text_file(Path::new(path), TAIL_MAX_BYTES);
    if raw.trim().is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = raw.lines().collect();
    let start = lines.len().saturating_sub(500);
    for line in lines[start..].iter().rev() {
        let Some(obj) = parse_line(line) else {
            continue;
        };
        let event_type = get_event_type(&obj);
        if matches!(event_type.as_str(), "agent_message" | "assistant_message") {
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return truncate_text(trimmed, max_chars);
                }
            }
        }
        if event_type.starts_with("item.") {
            if let Some(item) = tether_core::extract_item(&obj) {
                let item_type = tether_core::extract_item_type(item);
                if matches!(item_type.as_str(), "assistant_message" | "message") {
                    if let Some(text) = tether_core::extract_item_text(item) {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            return truncate_text(trimmed, max_chars);
                        }
                    }
                }
            }
        }
    }
    String::new()
}

/// Re-render the last portion of the stdout line-JSON into plain preview
/// text mirroring the live stream formatting.
pub fn preview_from_stdout_log(path: Option<&str>, max_chars: usize) -> String {
    let Some(path) = path else {
        return String::new();
    };
    let raw = tail_text_file(Path::new(path), TAIL_MAX_BYTES);
    if raw.trim().is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = raw.lines().collect();
    let start = lines.len().saturating_sub(250);

    let mut pieces: Vec<String> = Vec::new();
    let mut last_cmd: Option<String> = None;
    for line in &lines[start..] {
        let Some(obj) = parse_line(line) else {
            if !line.trim().is_empty() {
                pieces.push((*line).to_string());
            }
            continue;
        };

        let event_type = get_event_type(&obj);
        if matches!(event_type.as_str(), "agent_message" | "assistant_message") {
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    pieces.push(format!("\n{text}\n"));
                }
            }
            continue;
        }

        match decode(&obj) {
            AgentEvent::Reasoning | AgentEvent::ThreadStarted { .. } => {}
            AgentEvent::CommandExecution {
                command,
                output,
                exit_code,
                started,
                finished,
            } => {
                if let Some(cmd) = command {
                    if (started || finished) && last_cmd.as_deref() != Some(cmd.as_str()) {
                        pieces.push(format!("\n$ {cmd}\n"));
                        last_cmd = Some(cmd);
                    }
                }
                if finished {
                    if let Some(out) = output {
                        if !out.trim().is_empty() {
                            pieces.push(format!("{}\n", truncate_text(&out, 800)));
                        }
                    }
                    if let Some(code) = exit_code {
                        pieces.push(format!("(exit_code: {code})\n"));
                    }
                }
            }
            AgentEvent::ItemText(text) | AgentEvent::TextDelta(text) => pieces.push(text),
            AgentEvent::ToolUse { command } => {
                pieces.push(format!("\n[tool_use]\n{}\n", command.unwrap_or_default()));
            }
            AgentEvent::ToolResult { output } => {
                pieces.push(format!(
                    "\n[tool_result]\n{}\n",
                    truncate_text(&output.unwrap_or_default(), 800)
                ));
            }
            AgentEvent::Diff(diff) => {
                pieces.push(format!("\n[file_change]\n{}\n", truncate_text(&diff, 800)));
            }
            AgentEvent::Other => {}
        }
    }

    truncate_text(pieces.concat().trim(), max_chars)
}

/// Last lines of the stderr log, truncated to `max_chars`.
pub fn preview_from_stderr_log(path: Option<&str>, max_chars: usize) -> String {
    let Some(path) = path else {
        return String::new();
    };
    let raw = tail_text_file(Path::new(path), TAIL_MAX_BYTES);
    if raw.trim().is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = raw.lines().collect();
    let start = lines.len().saturating_sub(40);
    truncate_text(&lines[start..].join("\n"), max_chars)
}

#[cfg(test)]
#[path = "log_view_tests.rs"]
mod tests;
