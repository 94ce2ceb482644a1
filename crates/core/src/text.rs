// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text shaping for chat messages: HTML escaping, budgeted truncation, and
//! tag stripping. All budgets are counted in characters, not bytes.

use std::sync::OnceLock;

use regex::Regex;

/// Hard message-length ceiling imposed by the chat transport.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Escape text for embedding in an HTML-mode chat message.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn take_last_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if total <= n {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Truncate to `limit` characters by cutting the middle, keeping the head
/// and the tail around a marker line.
pub fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head = (limit / 2).saturating_sub(10);
    let tail = limit.saturating_sub(head + 20);
    format!(
        "{}\n…(truncated)…\n{}",
        take_chars(text, head),
        take_last_chars(text, tail)
    )
}

/// Keep the last `limit` characters, prefixing an ellipsis when cut.
pub fn tail_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let prefix = "…";
    let keep = limit.saturating_sub(prefix.chars().count());
    if keep == 0 {
        return take_last_chars(text, limit).to_string();
    }
    format!("{}{}", prefix, take_last_chars(text, keep))
}

fn tag_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").ok()).as_ref()
}

/// Strip HTML tags and undo the entity escaping from [`escape_html`].
pub fn strip_html_tags(text_html: &str) -> String {
    let raw = match tag_re() {
        Some(re) => re.replace_all(text_html, "").into_owned(),
        None => text_html.to_string(),
    };
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Wrap plain text in a `<pre><code>` block guaranteed to fit `max_chars`
/// after escaping, shrinking the plain budget until it does.
pub fn safe_html_code_block(text: &str, max_chars: usize) -> String {
    let mut plain_budget = max_chars.saturating_sub(50).max(200);
    for _ in 0..12 {
        let mut view = text.trim().to_string();
        if view.chars().count() > plain_budget {
            view = truncate_text(&view, plain_budget);
        }
        let candidate = format!("<pre><code>{}</code></pre>", escape_html(&view));
        if candidate.chars().count() <= max_chars {
            return candidate;
        }
        plain_budget = ((plain_budget * 7) / 10).max(200);
    }
    let view = truncate_text(text.trim(), (max_chars / 2).max(200));
    format!("<pre><code>{}</code></pre>", escape_html(&view))
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
