// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline-button callback tokens: `"v3:<action>[:<arg>]"`.

/// Protocol prefix carried by every callback token.
pub const CALLBACK_PREFIX: &str = "v3";

/// Build a callback token. Colons inside parts are replaced so the token
/// stays splittable.
pub fn cb(parts: &[&str]) -> String {
    let mut token = CALLBACK_PREFIX.to_string();
    for part in parts {
        token.push(':');
        token.push_str(&part.replace(':', "_"));
    }
    token
}

/// Split a callback token into `(action, arg)`. Returns `None` for tokens
/// that do not carry our prefix.
pub fn parse_cb(data: &str) -> Option<(String, Option<String>)> {
    let mut parts = data.split(':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let action = parts.next().unwrap_or("").to_string();
    let arg = parts.next().map(str::to_string);
    Some((action, arg))
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
