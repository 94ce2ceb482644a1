// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn status_serializes_lowercase() {
    let json = serde_json::to_string(&SessionStatus::Running).unwrap();
    assert_eq!(json, "\"running\"");
    let back: SessionStatus = serde_json::from_str("\"stopped\"").unwrap();
    assert_eq!(back, SessionStatus::Stopped);
}

#[test]
fn status_parse_lenient_defaults_to_idle() {
    assert_eq!(SessionStatus::parse_lenient("bogus"), SessionStatus::Idle);
    assert_eq!(SessionStatus::parse_lenient("running"), SessionStatus::Running);
}

#[test]
fn last_result_parse_lenient_defaults_to_never() {
    assert_eq!(LastResult::parse_lenient(""), LastResult::Never);
    assert_eq!(LastResult::parse_lenient("success"), LastResult::Success);
}

#[test]
fn reasoning_effort_parse_rejects_unknown_levels() {
    assert_eq!(ReasoningEffort::parse("xhigh"), Some(ReasoningEffort::Xhigh));
    assert_eq!(ReasoningEffort::parse("ultra"), None);
}

#[test]
fn run_mode_parse_lenient_defaults_to_new() {
    assert_eq!(RunMode::parse_lenient("continue"), RunMode::Continue);
    assert_eq!(RunMode::parse_lenient("anything"), RunMode::New);
}

#[test]
fn new_record_has_defaults_and_counts_as_never_ran() {
    let rec = SessionRecord::new("s1", "/tmp/proj");
    assert_eq!(rec.model, DEFAULT_MODEL);
    assert_eq!(rec.reasoning_effort, ReasoningEffort::High);
    assert_eq!(rec.status, SessionStatus::Idle);
    assert_eq!(rec.last_result, LastResult::Never);
    assert!(rec.never_ran());
    assert!(!rec.created_at.is_empty());
}

#[test]
fn never_ran_turns_false_once_artifacts_exist() {
    let mut rec = SessionRecord::new("s1", "/tmp/proj");
    rec.last_stdout_log = Some("/tmp/logs/s1.jsonl".into());
    assert!(!rec.never_ran());
}
