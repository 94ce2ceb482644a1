// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "work", Some("work") },
    dotted = { "api.v2", Some("api.v2") },
    mixed = { "A-b_c.9", Some("A-b_c.9") },
    trimmed = { "  pad  ", Some("pad") },
    empty = { "", None },
    whitespace_only = { "   ", None },
    slash = { "a/b", None },
    space_inside = { "a b", None },
    unicode = { "тест", None },
    colon = { "a:b", None },
)]
fn validates_names(raw: &str, expected: Option<&str>) {
    assert_eq!(safe_session_name(raw).as_deref(), expected);
}

#[test]
fn rejects_names_over_64_chars() {
    let long = "a".repeat(65);
    assert_eq!(safe_session_name(&long), None);
    let ok = "a".repeat(64);
    assert_eq!(safe_session_name(&ok).as_deref(), Some(ok.as_str()));
}
