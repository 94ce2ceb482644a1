// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural extraction from the agent CLI's weakly-typed line-JSON output.
//!
//! Every helper is a pure function over a [`serde_json::Value`] tree with an
//! explicit optional result; [`decode`] folds them into a closed set of
//! event variants. Field names vary across agent versions, so each extractor
//! tries a fixed priority list of keys, at the top level first and then
//! under a `data` mirror.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// One decoded line of agent output.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A `thread.started`-style event, possibly carrying the continuation id.
    ThreadStarted { thread_id: Option<String> },
    /// A `command_execution` item. `started`/`finished` are derived from the
    /// event-kind suffix and the item status.
    CommandExecution {
        command: Option<String>,
        output: Option<String>,
        exit_code: Option<i64>,
        started: bool,
        finished: bool,
    },
    /// A reasoning item; consumers drop these.
    Reasoning,
    /// Free text carried by an `item.*` event.
    ItemText(String),
    /// A streamed text delta.
    TextDelta(String),
    /// A tool invocation; `command` is absent when the shape is unknown.
    ToolUse { command: Option<String> },
    /// A tool result; `output` is absent when the shape is unknown.
    ToolResult { output: Option<String> },
    /// A unified diff snippet.
    Diff(String),
    /// Nothing recognizable.
    Other,
}

fn get_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(|v| v.as_str())
}

fn data<'a>(obj: &'a Value) -> Option<&'a Value> {
    obj.get("data").filter(|v| v.is_object())
}

/// Event kind: first non-empty string among `type`, `event`, `kind`, `name`.
pub fn get_event_type(obj: &Value) -> String {
    for key in ["type", "event", "kind", "name"] {
        if let Some(val) = get_str(obj, key) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    String::new()
}

fn uuid_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
        )
        .ok()
    })
    .as_ref()
}

/// Return the first canonical 8-4-4-4-12 UUID embedded in a string value.
pub fn looks_like_uuid(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    Some(uuid_re()?.find(s)?.as_str().to_string())
}

/// Continuation id from the explicitly known locations:
/// `session_id` / `thread_id`, nested `thread.id` / `session.id`, and the
/// same four under `data`.
pub fn extract_session_id(obj: &Value) -> Option<String> {
    let mut candidates: Vec<&Value> = Vec::new();
    collect_session_id_candidates(obj, &mut candidates);
    if let Some(d) = data(obj) {
        collect_session_id_candidates(d, &mut candidates);
    }
    candidates.into_iter().find_map(looks_like_uuid)
}

fn collect_session_id_candidates<'a>(obj: &'a Value, out: &mut Vec<&'a Value>) {
    for key in ["session_id", "thread_id"] {
        if let Some(v) = obj.get(key) {
            out.push(v);
        }
    }
    for key in ["thread", "session"] {
        if let Some(v) = obj.get(key).and_then(|n| n.get("id")) {
            out.push(v);
        }
    }
}

/// Depth-bounded scan for the first UUID-shaped token anywhere in the tree.
///
/// Objects are probed at `session_id` / `thread_id` / `id` before their
/// remaining values.
pub fn find_first_uuid(value: &Value) -> Option<String> {
    const MAX_DEPTH: usize = 6;

    fn walk(node: &Value, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }
        if let Some(found) = looks_like_uuid(node) {
            return Some(found);
        }
        match node {
            Value::Object(map) => {
                for key in ["session_id", "thread_id", "id"] {
                    if let Some(found) = map.get(key).and_then(looks_like_uuid) {
                        return Some(found);
                    }
                }
                map.values().find_map(|v| walk(v, depth + 1))
            }
            Value::Array(items) => items.iter().find_map(|v| walk(v, depth + 1)),
            _ => None,
        }
    }

    walk(value, 0)
}

/// First non-empty of `delta`, `text`, `content`, top level before `data`.
pub fn extract_text_delta(obj: &Value) -> Option<String> {
    let pick = |node: &Value| {
        for key in ["delta", "text", "content"] {
            if let Some(val) = get_str(node, key) {
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
        None
    };
    pick(obj).or_else(|| data(obj).and_then(pick))
}

/// The `item` object, at the top level or under `data`.
pub fn extract_item(obj: &Value) -> Option<&Value> {
    obj.get("item")
        .filter(|v| v.is_object())
        .or_else(|| data(obj).and_then(|d| d.get("item")).filter(|v| v.is_object()))
}

/// The item's `type`, trimmed; empty when absent.
pub fn extract_item_type(item: &Value) -> String {
    get_str(item, "type").map(str::trim).unwrap_or("").to_string()
}

/// Item text by the same priority as [`extract_text_delta`], top level only.
pub fn extract_item_text(item: &Value) -> Option<String> {
    for key in ["delta", "text", "content"] {
        if let Some(val) = get_str(item, key) {
            if !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Tool command: `command` / `cmd` at the top or under `data`, then
/// `input.command` at the top or under `data`.
pub fn extract_tool_command(obj: &Value) -> Option<String> {
    let direct = |node: &Value| {
        for key in ["command", "cmd"] {
            if let Some(val) = get_str(node, key) {
                let trimmed = val.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    };
    let via_input = |node: &Value| {
        let cmd = node.get("input").and_then(|i| get_str(i, "command"))?;
        let trimmed = cmd.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    direct(obj)
        .or_else(|| data(obj).and_then(direct))
        .or_else(|| via_input(obj))
        .or_else(|| data(obj).and_then(via_input))
}

/// Tool output: first non-empty of `output`, `stdout`, `result`, `text`,
/// top level before `data`.
pub fn extract_tool_output(obj: &Value) -> Option<String> {
    let pick = |node: &Value| {
        for key in ["output", "stdout", "result", "text"] {
            if let Some(val) = get_str(node, key) {
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
        None
    };
    pick(obj).or_else(|| data(obj).and_then(pick))
}

/// Diff snippet: `diff` / `patch` / `unified_diff`, top level before `data`.
pub fn maybe_extract_diff(obj: &Value) -> Option<String> {
    let pick = |node: &Value| {
        for key in ["diff", "patch", "unified_diff"] {
            if let Some(val) = get_str(node, key) {
                if !val.trim().is_empty() {
                    return Some(val.to_string());
                }
            }
        }
        None
    };
    pick(obj).or_else(|| data(obj).and_then(pick))
}

/// Fold one line-JSON object into an [`AgentEvent`].
pub fn decode(obj: &Value) -> AgentEvent {
    let event_type = get_event_type(obj);

    if matches!(
        event_type.as_str(),
        "thread.started" | "thread_started" | "thread.start"
    ) {
        let thread_id = extract_session_id(obj).or_else(|| find_first_uuid(obj));
        return AgentEvent::ThreadStarted { thread_id };
    }

    if event_type.starts_with("item.") {
        if let Some(item) = extract_item(obj) {
            let item_type = extract_item_type(item);
            if item_type == "reasoning" {
                return AgentEvent::Reasoning;
            }
            if item_type == "command_execution" {
                let status = get_str(item, "status").unwrap_or("");
                let started = event_type.ends_with("started") || status == "in_progress";
                let finished = event_type.ends_with("completed")
                    || matches!(status, "completed" | "failed");
                let command = get_str(item, "command")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                return AgentEvent::CommandExecution {
                    command,
                    output: get_str(item, "aggregated_output").map(str::to_string),
                    exit_code: item.get("exit_code").and_then(Value::as_i64),
                    started,
                    finished,
                };
            }
            if let Some(text) = extract_item_text(item) {
                return AgentEvent::ItemText(text);
            }
        }
    }

    if event_type == "text" {
        return match extract_text_delta(obj) {
            Some(delta) => AgentEvent::TextDelta(delta),
            None => AgentEvent::Other,
        };
    }

    if event_type == "tool_use" {
        return AgentEvent::ToolUse {
            command: extract_tool_command(obj),
        };
    }

    if event_type == "tool_result" {
        return AgentEvent::ToolResult {
            output: extract_tool_output(obj),
        };
    }

    if let Some(diff) = maybe_extract_diff(obj) {
        return AgentEvent::Diff(diff);
    }

    match extract_text_delta(obj) {
        Some(delta) => AgentEvent::TextDelta(delta),
        None => AgentEvent::Other,
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
