// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

const UUID_A: &str = "0a1b2c3d-4e5f-6789-abcd-ef0123456789";
const UUID_B: &str = "11111111-2222-3333-4444-555555555555";

#[test]
fn event_type_priority_is_type_event_kind_name() {
    let obj = json!({"type": "text", "event": "other", "kind": "x", "name": "y"});
    assert_eq!(get_event_type(&obj), "text");

    let obj = json!({"type": "  ", "event": "turn.started"});
    assert_eq!(get_event_type(&obj), "turn.started");

    let obj = json!({"kind": "k", "name": "n"});
    assert_eq!(get_event_type(&obj), "k");

    let obj = json!({"name": "n"});
    assert_eq!(get_event_type(&obj), "n");

    assert_eq!(get_event_type(&json!({})), "");
}

#[test]
fn uuid_recognizer_accepts_canonical_form_only() {
    assert_eq!(
        looks_like_uuid(&json!(UUID_A)).as_deref(),
        Some(UUID_A)
    );
    // Embedded in other text still matches on word boundaries.
    assert_eq!(
        looks_like_uuid(&json!(format!("prefix {UUID_A} suffix"))).as_deref(),
        Some(UUID_A)
    );
    assert_eq!(looks_like_uuid(&json!("not-a-uuid")), None);
    assert_eq!(looks_like_uuid(&json!("0a1b2c3d4e5f6789abcdef0123456789")), None);
    assert_eq!(looks_like_uuid(&json!(42)), None);
}

#[test]
fn session_id_prefers_explicit_keys_over_nested() {
    let obj = json!({
        "session_id": UUID_A,
        "thread": {"id": UUID_B},
    });
    assert_eq!(extract_session_id(&obj).as_deref(), Some(UUID_A));
}

#[test]
fn session_id_falls_back_to_data_mirror() {
    let obj = json!({"data": {"thread": {"id": UUID_B}}});
    assert_eq!(extract_session_id(&obj).as_deref(), Some(UUID_B));
}

#[test]
fn session_id_ignores_non_uuid_candidates() {
    let obj = json!({"session_id": "sess-42", "data": {"session": {"id": UUID_A}}});
    assert_eq!(extract_session_id(&obj).as_deref(), Some(UUID_A));
}

#[test]
fn find_first_uuid_probes_known_keys_first() {
    let obj = json!({
        "misc": UUID_B,
        "id": UUID_A,
    });
    // "id" is probed before the value scan regardless of map order.
    assert_eq!(find_first_uuid(&obj).as_deref(), Some(UUID_A));
}

#[test]
fn find_first_uuid_is_depth_bounded() {
    let mut obj = json!(UUID_A);
    for _ in 0..10 {
        obj = json!({"nested": obj});
    }
    assert_eq!(find_first_uuid(&obj), None);
}

#[test]
fn text_delta_priority_is_delta_text_content() {
    let obj = json!({"delta": "d", "text": "t", "content": "c"});
    assert_eq!(extract_text_delta(&obj).as_deref(), Some("d"));

    let obj = json!({"text": "t", "content": "c"});
    assert_eq!(extract_text_delta(&obj).as_deref(), Some("t"));

    let obj = json!({"delta": "", "content": "c"});
    assert_eq!(extract_text_delta(&obj).as_deref(), Some("c"));
}

#[test]
fn text_delta_top_level_wins_over_data() {
    let obj = json!({"content": "top", "data": {"delta": "nested"}});
    assert_eq!(extract_text_delta(&obj).as_deref(), Some("top"));

    let obj = json!({"data": {"text": "nested"}});
    assert_eq!(extract_text_delta(&obj).as_deref(), Some("nested"));
}

#[test]
fn tool_command_priority_and_input_fallback() {
    let obj = json!({"command": "ls", "cmd": "pwd"});
    assert_eq!(extract_tool_command(&obj).as_deref(), Some("ls"));

    let obj = json!({"input": {"command": "  make test  "}});
    assert_eq!(extract_tool_command(&obj).as_deref(), Some("make test"));

    let obj = json!({"data": {"cmd": "echo hi"}});
    assert_eq!(extract_tool_command(&obj).as_deref(), Some("echo hi"));

    assert_eq!(extract_tool_command(&json!({"command": "   "})), None);
}

#[test]
fn tool_output_priority_is_output_stdout_result_text() {
    let obj = json!({"stdout": "s", "result": "r", "text": "t"});
    assert_eq!(extract_tool_output(&obj).as_deref(), Some("s"));

    let obj = json!({"data": {"result": "nested"}});
    assert_eq!(extract_tool_output(&obj).as_deref(), Some("nested"));
}

#[test]
fn diff_keys_in_order() {
    let obj = json!({"patch": "p", "unified_diff": "u"});
    assert_eq!(maybe_extract_diff(&obj).as_deref(), Some("p"));
    assert_eq!(maybe_extract_diff(&json!({"diff": "  "})), None);
}

#[test]
fn decode_thread_started_extracts_id() {
    let obj = json!({"type": "thread.started", "thread_id": UUID_A});
    assert_eq!(
        decode(&obj),
        AgentEvent::ThreadStarted {
            thread_id: Some(UUID_A.to_string())
        }
    );
}

#[test]
fn decode_thread_started_scans_for_uuid_when_not_explicit() {
    let obj = json!({"type": "thread_started", "payload": {"ref": UUID_B}});
    assert_eq!(
        decode(&obj),
        AgentEvent::ThreadStarted {
            thread_id: Some(UUID_B.to_string())
        }
    );
}

#[test]
fn decode_drops_reasoning_items() {
    let obj = json!({"type": "item.completed", "item": {"type": "reasoning", "text": "hmm"}});
    assert_eq!(decode(&obj), AgentEvent::Reasoning);
}

#[test]
fn decode_command_execution_started() {
    let obj = json!({
        "type": "item.started",
        "item": {"type": "command_execution", "command": " cargo test ", "status": "in_progress"}
    });
    assert_eq!(
        decode(&obj),
        AgentEvent::CommandExecution {
            command: Some("cargo test".to_string()),
            output: None,
            exit_code: None,
            started: true,
            finished: false,
        }
    );
}

#[test]
fn decode_command_execution_completed_via_status() {
    let obj = json!({
        "type": "item.updated",
        "data": {"item": {
            "type": "command_execution",
            "command": "ls",
            "aggregated_output": "a\nb\n",
            "exit_code": 0,
            "status": "completed"
        }}
    });
    assert_eq!(
        decode(&obj),
        AgentEvent::CommandExecution {
            command: Some("ls".to_string()),
            output: Some("a\nb\n".to_string()),
            exit_code: Some(0),
            started: false,
            finished: true,
        }
    );
}

#[test]
fn decode_item_text() {
    let obj = json!({"type": "item.completed", "item": {"type": "assistant_message", "text": "hi"}});
    assert_eq!(decode(&obj), AgentEvent::ItemText("hi".to_string()));
}

#[test]
fn decode_text_event() {
    let obj = json!({"type": "text", "delta": "chunk"});
    assert_eq!(decode(&obj), AgentEvent::TextDelta("chunk".to_string()));
}

#[test]
fn decode_tool_use_and_result() {
    let obj = json!({"type": "tool_use", "input": {"command": "git status"}});
    assert_eq!(
        decode(&obj),
        AgentEvent::ToolUse {
            command: Some("git status".to_string())
        }
    );

    let obj = json!({"type": "tool_result", "output": "clean"});
    assert_eq!(
        decode(&obj),
        AgentEvent::ToolResult {
            output: Some("clean".to_string())
        }
    );
}

#[test]
fn decode_falls_back_to_diff_then_delta() {
    let obj = json!({"type": "turn.diff", "diff": "--- a\n+++ b"});
    assert_eq!(decode(&obj), AgentEvent::Diff("--- a\n+++ b".to_string()));

    let obj = json!({"type": "whatever", "content": "loose text"});
    assert_eq!(decode(&obj), AgentEvent::TextDelta("loose text".to_string()));

    assert_eq!(decode(&json!({"type": "noop"})), AgentEvent::Other);
}
