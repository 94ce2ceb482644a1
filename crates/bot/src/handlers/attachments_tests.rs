// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    clean = { "report.pdf", "report.pdf" },
    traversal = { "../../etc/passwd", ".._.._etc_passwd" },
    backslashes = { r"a\b\c.txt", "a_b_c.txt" },
    control_chars = { "a\tb\nc", "a_b_c" },
    dot = { ".", "file" },
    dotdot = { "..", "file" },
    empty = { "", "file" },
    spaces = { "  padded.txt  ", "padded.txt" },
)]
fn sanitizes_basenames(input: &str, expected: &str) {
    assert_eq!(sanitize_attachment_basename(input), expected);
}

#[test]
fn long_names_keep_their_extension() {
    let long = format!("{}.tar.gz", "x".repeat(300));
    let out = sanitize_attachment_basename(&long);
    assert!(out.chars().count() <= 180);
    assert!(out.ends_with(".gz"));

    let no_ext = "y".repeat(300);
    let out = sanitize_attachment_basename(&no_ext);
    assert_eq!(out.chars().count(), 180);
}

#[test]
fn unique_paths_append_counters() {
    let tmp = tempfile::tempdir().unwrap();
    let first = pick_unique_dest_path(tmp.path(), "data.csv");
    assert_eq!(first.file_name().unwrap(), "data.csv");
    std::fs::write(&first, "x").unwrap();

    let second = pick_unique_dest_path(tmp.path(), "data.csv");
    assert_eq!(second.file_name().unwrap(), "data_2.csv");
    std::fs::write(&second, "x").unwrap();

    let third = pick_unique_dest_path(tmp.path(), "data.csv");
    assert_eq!(third.file_name().unwrap(), "data_3.csv");
}

#[test]
fn prompt_lists_sorted_unique_files() {
    let prompt = build_prompt_with_files(
        "please review",
        &["b.txt".to_string(), "a.txt".to_string(), "b.txt".to_string()],
    );
    let a_pos = prompt.find("- a.txt").unwrap();
    let b_pos = prompt.find("- b.txt").unwrap();
    assert!(a_pos < b_pos);
    assert_eq!(prompt.matches("- b.txt").count(), 1);
    assert!(prompt.contains("please review"));
}

#[test]
fn prompt_without_text_asks_to_extract_the_task() {
    let prompt = build_prompt_with_files("  ", &["spec.pdf".to_string()]);
    assert!(prompt.contains("- spec.pdf"));
    assert!(prompt.contains("extract it and carry it out"));
    assert!(!prompt.contains("The user's message:"));
}

#[test]
fn extracts_document_attachments() {
    let raw = serde_json::json!({
        "message_id": 1,
        "chat": {"id": 2, "type": "private"},
        "document": {
            "file_id": "F1",
            "file_unique_id": "U1",
            "file_name": "notes.md",
            "file_size": 42,
        }
    });
    let message: tether_adapters::Message = serde_json::from_value(raw).unwrap();
    let refs = extract_message_attachments(&message);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].file_id, "F1");
    assert_eq!(refs[0].preferred_name.as_deref(), Some("notes.md"));
    assert_eq!(refs[0].file_size, Some(42));
}

#[test]
fn photos_pick_the_largest_size() {
    let raw = serde_json::json!({
        "message_id": 1,
        "chat": {"id": 2, "type": "private"},
        "photo": [
            {"file_id": "small", "file_unique_id": "s"},
            {"file_id": "large", "file_unique_id": "l"},
        ]
    });
    let message: tether_adapters::Message = serde_json::from_value(raw).unwrap();
    let refs = extract_message_attachments(&message);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].file_id, "large");
    assert!(refs[0].preferred_name.is_none());
    assert_eq!(refs[0].default_stem, "photo_l");
}
