// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "/use work", &["/use", "work"] },
    extra_spaces = { "/use   work  ", &["/use", "work"] },
    botname = { "/use@tetherbot work", &["/use", "work"] },
    empty = { "", &[] },
)]
fn splits_tokens(input: &str, expected: &[&str]) {
    assert_eq!(parse_tokens(input), expected);
}

#[test]
fn quotes_keep_spaces_together() {
    assert_eq!(
        parse_tokens(r#"/new s1 "/home/u/my project""#),
        vec!["/new", "s1", "/home/u/my project"]
    );
    assert_eq!(
        parse_tokens("/new s1 '/tmp/a b'"),
        vec!["/new", "s1", "/tmp/a b"]
    );
}

#[test]
fn empty_quoted_token_survives() {
    assert_eq!(parse_tokens(r#"/x """#), vec!["/x", ""]);
}

#[test]
fn unterminated_quote_keeps_the_rest() {
    assert_eq!(parse_tokens("/x 'a b"), vec!["/x", "a b"]);
}
