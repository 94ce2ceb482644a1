// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping decoded agent events onto stream writes.

use serde_json::Value;
use tether_core::{decode, extract_session_id, truncate_text, AgentEvent};

use crate::stream::Stream;

/// Budget for tool/command output embedded in the stream.
const TOOL_OUTPUT_BUDGET: usize = 2000;

/// Budget for diff snippets embedded in the stream.
const DIFF_BUDGET: usize = 2500;

/// Apply one line-JSON object to the stream.
///
/// `current_thread_id` is the session's stored continuation token;
/// `last_cmd` dedups consecutive `command_execution` banners within the run.
/// Returns a newly discovered continuation token the caller should persist.
pub fn apply_agent_event(
    stream: &Stream,
    obj: &Value,
    current_thread_id: Option<&str>,
    last_cmd: &mut Option<String>,
) -> Option<String> {
    let mut discovered = None;
    if current_thread_id.is_none() {
        discovered = extract_session_id(obj);
    }

    match decode(obj) {
        AgentEvent::ThreadStarted { thread_id } => {
            if let Some(id) = thread_id {
                if current_thread_id != Some(id.as_str()) {
                    discovered = Some(id);
                }
            }
        }
        AgentEvent::Reasoning => {}
        AgentEvent::CommandExecution {
            command,
            output,
            exit_code,
            started,
            finished,
        } => {
            if let Some(cmd) = command {
                if (started || finished) && last_cmd.as_deref() != Some(cmd.as_str()) {
                    stream.add_text(&format!("\n$ {cmd}\n"));
                    *last_cmd = Some(cmd);
                }
            }
            if finished {
                if let Some(out) = output {
                    if !out.trim().is_empty() {
                        let trimmed = out.trim_end_matches('\n');
                        stream
                            .add_text(&format!("{}\n", truncate_text(trimmed, TOOL_OUTPUT_BUDGET)));
                    }
                }
                if let Some(code) = exit_code {
                    stream.add_text(&format!("(exit_code: {code})\n"));
                }
            }
        }
        AgentEvent::ItemText(text) | AgentEvent::TextDelta(text) => stream.add_text(&text),
        AgentEvent::ToolUse { command } => {
            let body = command.unwrap_or_else(|| pretty_json(obj, TOOL_OUTPUT_BUDGET));
            stream.add_text(&format!("\n[tool_use]\n{body}\n"));
        }
        AgentEvent::ToolResult { output } => {
            let body = match output {
                Some(out) => truncate_text(&out, TOOL_OUTPUT_BUDGET),
                None => pretty_json(obj, TOOL_OUTPUT_BUDGET),
            };
            stream.add_text(&format!("\n[tool_result]\n{body}\n"));
        }
        AgentEvent::Diff(diff) => {
            stream.add_text(&format!("\n[file_change]\n{}\n", truncate_text(&diff, DIFF_BUDGET)));
        }
        AgentEvent::Other => {}
    }

    discovered
}

fn pretty_json(obj: &Value, budget: usize) -> String {
    let rendered = serde_json::to_string_pretty(obj).unwrap_or_else(|_| obj.to_string());
    truncate_text(&rendered, budget)
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
