// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The stream multiplexer: one background task per active run that owns a
//! single remote message and folds buffered subprocess output into throttled
//! edits of it.
//!
//! The background loop is a reduce over an explicit step decision
//! ([`next_step`]): wait for work, render, or exit. Pausing freezes the
//! message in place without tearing the loop down; stopping drains one final
//! render unless the stream is paused.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tether_adapters::{ChatTransport, InlineKeyboardMarkup, ParseMode, TransportError};
use tether_core::{escape_html, MAX_MESSAGE_CHARS};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Minimum interval between successful edits of one stream.
pub const EDIT_THROTTLE: Duration = Duration::from_secs(2);

/// Headroom reserved for HTML wrappers and escaping expansion.
const HTML_HEADROOM: usize = 250;

/// Floor for the per-render plain log budget.
const MIN_LOG_BUDGET: usize = 300;

/// Marker shown when the tail does not cover the whole log.
const HIDDEN_MARKER: &str = "…previous output hidden…\n\n";

/// Footer provider, called on every render.
pub type FooterProvider = Box<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Code,
}

/// One buffered chunk of log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
}

impl Segment {
    fn text(content: impl Into<String>) -> Self {
        Segment {
            kind: SegmentKind::Text,
            content: content.into(),
        }
    }

    fn plain_len(&self) -> usize {
        self.content.chars().count()
    }

    fn render_html(&self) -> String {
        match self.kind {
            SegmentKind::Code => format!("<pre><code>{}</code></pre>", escape_html(&self.content)),
            SegmentKind::Text => escape_html(&self.content),
        }
    }
}

/// Initial presentation of a stream.
#[derive(Default)]
pub struct StreamConfig {
    pub header_html: String,
    pub header_plain_len: usize,
    pub auto_clear_header_on_first_log: bool,
    pub footer: Option<FooterProvider>,
    pub footer_plain_len: usize,
    pub wrap_log_in_pre: bool,
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

struct StreamState {
    header_html: String,
    header_plain_len: usize,
    auto_clear_header_on_first_log: bool,
    footer: Option<FooterProvider>,
    footer_plain_len: usize,
    wrap_log_in_pre: bool,
    reply_markup: Option<InlineKeyboardMarkup>,
    segments: Vec<Segment>,
    dirty: bool,
    paused: bool,
    stopping: bool,
    last_sent: Option<(String, Option<InlineKeyboardMarkup>)>,
}

impl StreamState {
    fn clear_header_if_auto(&mut self) {
        if self.auto_clear_header_on_first_log {
            self.auto_clear_header_on_first_log = false;
            self.header_html.clear();
            self.header_plain_len = 0;
        }
    }
}

/// What the background loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Wait,
    Render,
    Exit,
}

/// Single decision point of the loop. Render consumes the dirty flag.
fn next_step(state: &mut StreamState) -> Step {
    if state.stopping && !state.dirty {
        return Step::Exit;
    }
    if !state.dirty {
        return Step::Wait;
    }
    if state.paused {
        // A stop that arrives while paused drops the pending render; the
        // frozen message keeps its last content.
        return if state.stopping { Step::Exit } else { Step::Wait };
    }
    state.dirty = false;
    Step::Render
}

/// Newest-first selection of whole segments within a plain budget. A single
/// oversized segment is kept as its tail. The flag reports whether anything
/// was dropped.
fn tail_segments(segments: &[Segment], max_plain: usize) -> (Vec<Segment>, bool) {
    let mut total = 0usize;
    let mut kept_rev: Vec<Segment> = Vec::new();
    for seg in segments.iter().rev() {
        let len = seg.plain_len();
        if total + len <= max_plain {
            kept_rev.push(seg.clone());
            total += len;
            continue;
        }
        if kept_rev.is_empty() {
            let chars: Vec<char> = seg.content.chars().collect();
            let start = chars.len().saturating_sub(max_plain);
            kept_rev.push(Segment {
                kind: seg.kind,
                content: chars[start..].iter().collect(),
            });
        }
        break;
    }
    kept_rev.reverse();
    let hidden = kept_rev.len() < segments.len();
    (kept_rev, hidden)
}

fn render_html(state: &StreamState) -> String {
    let footer_html = state
        .footer
        .as_ref()
        .map(|provider| provider())
        .unwrap_or_default();
    let header_html = state.header_html.trim();
    let footer_html = footer_html.trim();

    let max_plain_total = if MAX_MESSAGE_CHARS - HTML_HEADROOM < 500 {
        MAX_MESSAGE_CHARS
    } else {
        MAX_MESSAGE_CHARS - HTML_HEADROOM
    };
    let mut max_plain_log = max_plain_total
        .saturating_sub(state.header_plain_len + state.footer_plain_len + 50)
        .max(MIN_LOG_BUDGET);

    let mut log_html = String::new();
    for _ in 0..8 {
        let (mut tail, hidden) = tail_segments(&state.segments, max_plain_log);
        if hidden {
            tail.insert(0, Segment::text(HIDDEN_MARKER));
        }

        log_html = if state.wrap_log_in_pre {
            let plain: String = tail.iter().map(|seg| seg.content.as_str()).collect();
            let plain = plain.trim_matches('\n');
            format!("<pre><code>{}</code></pre>", escape_html(plain))
        } else {
            let joined: String = tail.iter().map(Segment::render_html).collect();
            joined.trim().to_string()
        };

        let candidate = join_parts(header_html, &log_html, footer_html);
        if candidate.chars().count() <= MAX_MESSAGE_CHARS {
            return candidate;
        }
        max_plain_log = ((max_plain_log * 3) / 4).max(80);
    }
    join_parts(header_html, &log_html, footer_html)
}

fn join_parts(header: &str, log: &str, footer: &str) -> String {
    [header, log, footer]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A live stream bound to one `(chat, message)`.
pub struct Stream {
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    message_id: i64,
    state: Mutex<StreamState>,
    wake: Notify,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Stream {
    /// Create the stream and start its background edit loop. The initial
    /// presentation is rendered as soon as the throttle allows.
    pub fn spawn(
        transport: Arc<dyn ChatTransport>,
        chat_id: i64,
        message_id: i64,
        config: StreamConfig,
    ) -> Arc<Stream> {
        let stream = Arc::new(Stream {
            transport,
            chat_id,
            message_id,
            state: Mutex::new(StreamState {
                header_html: config.header_html,
                header_plain_len: config.header_plain_len,
                auto_clear_header_on_first_log: config.auto_clear_header_on_first_log,
                footer: config.footer,
                footer_plain_len: config.footer_plain_len,
                wrap_log_in_pre: config.wrap_log_in_pre,
                reply_markup: config.reply_markup,
                segments: Vec::new(),
                dirty: true,
                paused: false,
                stopping: false,
                last_sent: None,
            }),
            wake: Notify::new(),
            task: Mutex::new(None),
        });

        let handle = tokio::spawn(run_loop(Arc::clone(&stream)));
        *stream.task.lock() = Some(handle);
        stream
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn message_id(&self) -> i64 {
        self.message_id
    }

    fn mutate<F: FnOnce(&mut StreamState)>(&self, f: F) {
        {
            let mut state = self.state.lock();
            f(&mut state);
            state.dirty = true;
        }
        self.wake.notify_one();
    }

    /// Append plain text. Consecutive text segments merge.
    pub fn add_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.mutate(|state| {
            state.clear_header_if_auto();
            match state.segments.last_mut() {
                Some(last) if last.kind == SegmentKind::Text => last.content.push_str(text),
                _ => state.segments.push(Segment::text(text)),
            }
        });
    }

    /// Append a code block, visually separated from surrounding text.
    pub fn add_code(&self, code: &str) {
        if code.is_empty() {
            return;
        }
        self.mutate(|state| {
            state.clear_header_if_auto();
            let needs_break = state
                .segments
                .last()
                .map(|seg| !seg.content.ends_with('\n'))
                .unwrap_or(true);
            if needs_break {
                state.segments.push(Segment::text("\n"));
            }
            state.segments.push(Segment {
                kind: SegmentKind::Code,
                content: code.to_string(),
            });
            state.segments.push(Segment::text("\n"));
        });
    }

    pub fn set_header(&self, header_html: &str, header_plain_len: usize) {
        self.mutate(|state| {
            state.header_html = header_html.to_string();
            state.header_plain_len = header_plain_len;
        });
    }

    pub fn set_footer(
        &self,
        footer: Option<FooterProvider>,
        footer_plain_len: usize,
        wrap_log_in_pre: Option<bool>,
    ) {
        self.mutate(|state| {
            state.footer = footer;
            state.footer_plain_len = footer_plain_len;
            if let Some(wrap) = wrap_log_in_pre {
                state.wrap_log_in_pre = wrap;
            }
        });
    }

    pub fn set_reply_markup(&self, reply_markup: Option<InlineKeyboardMarkup>) {
        self.mutate(|state| state.reply_markup = reply_markup);
    }

    /// Freeze the message: buffered data keeps accumulating but no edits go
    /// out until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.state.lock().paused = true;
        self.wake.notify_one();
    }

    pub fn resume(&self) {
        {
            let mut state = self.state.lock();
            state.paused = false;
            state.dirty = true;
        }
        self.wake.notify_one();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Terminal flush: let the loop render once more (unless paused), then
    /// wait for it to exit.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            state.stopping = true;
            state.dirty = true;
        }
        self.wake.notify_one();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!(error = %e, "stream task ended abnormally");
            }
        }
    }
}

async fn run_loop(stream: Arc<Stream>) {
    let mut last_edit: Option<Instant> = None;

    loop {
        // Wait until there is something to do.
        let step = loop {
            let notified = stream.wake.notified();
            let step = next_step(&mut stream.state.lock());
            if step == Step::Wait {
                notified.await;
            } else {
                break step;
            }
        };
        if step == Step::Exit {
            return;
        }

        // Throttle. The terminal flush skips the wait so the final state is
        // not delayed.
        if let Some(prev) = last_edit {
            let stopping = stream.state.lock().stopping;
            if !stopping {
                let elapsed = prev.elapsed();
                if elapsed < EDIT_THROTTLE {
                    tokio::time::sleep(EDIT_THROTTLE - elapsed).await;
                }
            }
        }

        // Honor a pause that landed during the throttle sleep.
        loop {
            let notified = stream.wake.notified();
            let (paused, stopping) = {
                let state = stream.state.lock();
                (state.paused, state.stopping)
            };
            if paused && stopping {
                return;
            }
            if !paused {
                break;
            }
            notified.await;
        }

        // Snapshot, render, edit.
        let (html, markup, skip) = {
            let state = stream.state.lock();
            let html = render_html(&state);
            let markup = state.reply_markup.clone();
            let skip = state
                .last_sent
                .as_ref()
                .is_some_and(|(sent_html, sent_markup)| {
                    *sent_html == html && *sent_markup == markup
                });
            (html, markup, skip)
        };
        if !skip {
            edit_with_retries(&stream, &html, markup.as_ref()).await;
        }
        last_edit = Some(Instant::now());

        let done = {
            let state = stream.state.lock();
            state.stopping && !state.dirty
        };
        if done {
            return;
        }
    }
}

async fn edit_with_retries(stream: &Stream, html: &str, markup: Option<&InlineKeyboardMarkup>) {
    let stopping = stream.state.lock().stopping;
    // The terminal flush gets wider bounds so the final state is not lost to
    // flood control.
    let (max_attempts, max_total_wait) = if stopping {
        (12, Duration::from_secs(60))
    } else {
        (5, Duration::from_secs(15))
    };

    let started = Instant::now();
    let mut attempts = 0u32;
    let mut delay = Duration::ZERO;

    loop {
        attempts += 1;
        let result = stream
            .transport
            .edit_message_text(
                stream.chat_id,
                stream.message_id,
                html,
                Some(ParseMode::Html),
                markup,
            )
            .await;

        match result {
            Ok(()) => {
                record_sent(stream, html, markup);
                return;
            }
            Err(TransportError::NotModified) => {
                record_sent(stream, html, markup);
                return;
            }
            Err(TransportError::RateLimited { retry_after }) => {
                let advised = if retry_after.is_zero() {
                    Duration::from_secs(2)
                } else {
                    retry_after
                };
                delay = advised.max(delay * 2);
                if attempts >= max_attempts || started.elapsed() > max_total_wait {
                    if !stopping {
                        // Try again on the next cycle instead of blocking
                        // the whole stream here.
                        let mut state = stream.state.lock();
                        state.dirty = true;
                        drop(state);
                        stream.wake.notify_one();
                    }
                    return;
                }
                tokio::time::sleep(delay).await;
            }
            Err(TransportError::CannotEdit(reason)) => {
                // The message is gone; remember the payload so identical
                // renders stop hammering the API.
                debug!(
                    chat_id = stream.chat_id,
                    message_id = stream.message_id,
                    reason = %reason,
                    "stream target not editable; giving up this edit",
                );
                record_sent(stream, html, markup);
                return;
            }
            Err(e) => {
                warn!(
                    chat_id = stream.chat_id,
                    message_id = stream.message_id,
                    error = %e,
                    "stream edit failed; continuing",
                );
                return;
            }
        }
    }
}

fn record_sent(stream: &Stream, html: &str, markup: Option<&InlineKeyboardMarkup>) {
    stream.state.lock().last_sent = Some((html.to_string(), markup.cloned()));
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
