// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "/start", Some("start") },
    with_args = { "/use work", Some("use") },
    with_botname = { "/menu@tetherbot", Some("menu") },
    leading_spaces = { "  /list", Some("list") },
    not_a_command = { "hello", None },
    bare_slash = { "/", None },
    empty = { "", None },
)]
fn extracts_command_names(input: &str, expected: Option<&str>) {
    assert_eq!(command_name(input).as_deref(), expected);
}
