// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn retry_after_wins_over_description() {
    let err = classify_api_error(400, "message is not modified", Some(7));
    assert!(matches!(
        err,
        TransportError::RateLimited {
            retry_after
        } if retry_after == Duration::from_secs(7)
    ));
}

#[test]
fn flood_code_without_hint_gets_a_default_wait() {
    let err = classify_api_error(429, "Too Many Requests", None);
    assert!(matches!(err, TransportError::RateLimited { .. }));
}

#[test]
fn not_modified_is_recognized() {
    let err = classify_api_error(
        400,
        "Bad Request: message is not modified: specified new message content",
        None,
    );
    assert!(matches!(err, TransportError::NotModified));
}

#[test]
fn too_long_is_recognized() {
    let err = classify_api_error(400, "Bad Request: message is too long", None);
    assert!(matches!(err, TransportError::TooLong));
}

#[test]
fn parse_entities_matches_both_apostrophes() {
    for desc in [
        "Bad Request: can't parse entities: unclosed tag",
        "Bad Request: can’t parse entities: unclosed tag",
    ] {
        let err = classify_api_error(400, desc, None);
        assert!(matches!(err, TransportError::ParseEntities(_)), "{desc}");
    }
}

#[test]
fn gone_messages_classify_as_cannot_edit() {
    for desc in [
        "Bad Request: message can't be edited",
        "Bad Request: message to edit not found",
        "Bad Request: MESSAGE_ID_INVALID",
        "Bad Request: chat not found",
    ] {
        let err = classify_api_error(400, desc, None);
        assert!(matches!(err, TransportError::CannotEdit(_)), "{desc}");
    }
}

#[test]
fn anything_else_is_a_plain_api_error() {
    let err = classify_api_error(403, "Forbidden: bot was blocked by the user", None);
    assert!(matches!(err, TransportError::Api { code: 403, .. }));
}

#[test]
fn transient_classification() {
    assert!(TransportError::RateLimited {
        retry_after: Duration::from_secs(1)
    }
    .is_transient());
    assert!(TransportError::Network("reset".into()).is_transient());
    assert!(!TransportError::TooLong.is_transient());
    assert!(!TransportError::NotModified.is_transient());
}

#[test]
fn markup_serializes_to_the_wire_shape() {
    let markup = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("⬅️", "v3:back"),
        InlineKeyboardButton::new("⛔", "v3:interrupt"),
    ]]);
    let value = serde_json::to_value(&markup).unwrap();
    assert_eq!(value["inline_keyboard"][0][1]["callback_data"], "v3:interrupt");
}

#[test]
fn update_parses_with_unknown_fields() {
    let raw = serde_json::json!({
        "update_id": 5,
        "message": {
            "message_id": 9,
            "date": 123,
            "chat": {"id": -100, "type": "supergroup", "title": "t"},
            "from": {"id": 7, "is_bot": false, "first_name": "x"},
            "text": "hello",
            "entities": [],
        }
    });
    let update: types::Update = serde_json::from_value(raw).unwrap();
    let message = update.message.unwrap();
    assert_eq!(message.chat.id, -100);
    assert_eq!(message.chat.kind, "supergroup");
    assert_eq!(message.text.as_deref(), Some("hello"));
    assert!(!message.has_attachment());
}

#[test]
fn photo_message_counts_as_attachment() {
    let raw = serde_json::json!({
        "message_id": 1,
        "chat": {"id": 2, "type": "private"},
        "photo": [{"file_id": "small"}, {"file_id": "big"}],
        "media_group_id": "g1",
    });
    let message: types::Message = serde_json::from_value(raw).unwrap();
    assert!(message.has_attachment());
    assert_eq!(message.media_group_id.as_deref(), Some("g1"));
}
