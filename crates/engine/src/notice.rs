// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The one-shot completion notice sent after a run resolves.

use std::time::{Duration, Instant};

use tether_adapters::{
    ChatTransport, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode, TransportError,
};
use tether_core::{cb, escape_html, truncate_text, MAX_MESSAGE_CHARS};
use tracing::warn;

/// Wall-clock budget for getting the notice out.
const MAX_TOTAL_WAIT: Duration = Duration::from_secs(60 * 60);

/// Retry attempts for non-rate-limit transient failures.
const MAX_ATTEMPTS: u32 = 10;

/// Backoff ceiling between retries.
const MAX_DELAY: Duration = Duration::from_secs(30);

fn ack_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::new("✅", cb(&["ack"]))]])
}

fn html_payload(session_name: &str, path: &str, prompt: &str) -> String {
    let prompt_clean = {
        let trimmed = prompt.trim();
        if trimmed.is_empty() { "(empty)" } else { trimmed }
    };

    let mut prompt_max = 2400usize;
    let mut text_html = String::new();
    for _ in 0..10 {
        let prompt_view = if prompt_clean.chars().count() > prompt_max {
            truncate_text(prompt_clean, prompt_max)
        } else {
            prompt_clean.to_string()
        };

        text_html = format!(
            "<b>Run finished</b>\nSession: <code>{}</code>\nPath: <code>{}</code>\n\n<b>Prompt:</b>\n<pre><code>{}</code></pre>",
            escape_html(session_name),
            escape_html(path),
            escape_html(&prompt_view),
        );
        if text_html.chars().count() <= MAX_MESSAGE_CHARS {
            break;
        }
        prompt_max = ((prompt_max * 7) / 10).max(200);
    }
    text_html
}

fn plain_payload(session_name: &str, path: &str, prompt: &str) -> String {
    let prompt_clean = {
        let trimmed = prompt.trim();
        if trimmed.is_empty() { "(empty)" } else { trimmed }
    };
    let text = format!(
        "Run finished\nSession: {session_name}\nPath: {path}\n\nPrompt:\n{}",
        truncate_text(prompt_clean, 2000),
    );
    truncate_text(text.trim(), 3500)
}

/// Send the completion notice, HTML first, plain fallback second. Rate
/// limits are honored inside a one-hour budget; other transient failures
/// retry with doubling delay. Failure is logged, never propagated.
pub async fn send_completion_notice(
    transport: &dyn ChatTransport,
    chat_id: i64,
    session_name: &str,
    path: &str,
    prompt: &str,
) {
    let keyboard = ack_keyboard();
    let payloads = [
        (html_payload(session_name, path, prompt), Some(ParseMode::Html)),
        (plain_payload(session_name, path, prompt), None),
    ];

    for (text, parse_mode) in payloads {
        let started = Instant::now();
        let mut remaining_attempts = MAX_ATTEMPTS;
        let mut delay = Duration::from_secs(1);

        loop {
            match transport
                .send_message(chat_id, &text, parse_mode, Some(&keyboard))
                .await
            {
                Ok(_) => return,
                Err(TransportError::RateLimited { retry_after }) => {
                    tokio::time::sleep(retry_after).await;
                    if started.elapsed() > MAX_TOTAL_WAIT {
                        warn!(chat_id, "completion notice gave up waiting out rate limits");
                        break;
                    }
                }
                Err(TransportError::Network(e)) => {
                    remaining_attempts = remaining_attempts.saturating_sub(1);
                    if remaining_attempts == 0 || started.elapsed() > MAX_TOTAL_WAIT {
                        warn!(chat_id, error = %e, "completion notice failed after retries");
                        break;
                    }
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
                Err(e) => {
                    // Semantic refusal; fall through to the plain payload.
                    warn!(chat_id, error = %e, "completion notice rejected");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "notice_tests.rs"]
mod tests;
