// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model/reasoning settings and the await-prompt screen.

use tether_adapters::{InlineKeyboardButton, InlineKeyboardMarkup};
use tether_core::{cb, escape_html, ReasoningEffort, RunMode, SessionRecord};
use tether_engine::Registry;

use super::{notice_html, Screen, LABEL_BACK};

fn mark(label: &str, selected: bool) -> String {
    if selected {
        format!("✅ {label}")
    } else {
        label.to_string()
    }
}

fn compact_info(rec: &SessionRecord) -> String {
    format!(
        "<code>{}</code> <code>{}</code>\n<code>{}</code>",
        escape_html(&rec.model),
        escape_html(rec.reasoning_effort.as_str()),
        escape_html(&rec.path),
    )
}

pub fn render_model(rec: &SessionRecord, presets: &[String], notice: Option<&str>) -> Screen {
    let text_html = format!(
        "{}<b>Run settings</b>\n\n{}\n\nModel: <code>{}</code>\nReasoning effort: <code>{}</code>\n\nPick overrides below.",
        notice_html(notice),
        compact_info(rec),
        escape_html(&rec.model),
        escape_html(rec.reasoning_effort.as_str()),
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let buttons: Vec<InlineKeyboardButton> = presets
        .iter()
        .enumerate()
        .map(|(i, model)| {
            InlineKeyboardButton::new(
                mark(model, *model == rec.model),
                cb(&["model_pick", &i.to_string()]),
            )
        })
        .collect();
    for chunk in buttons.chunks(2) {
        rows.push(chunk.to_vec());
    }
    rows.push(vec![InlineKeyboardButton::new(
        mark("📝", !presets.iter().any(|m| *m == rec.model)),
        cb(&["model_custom"]),
    )]);
    rows.push(
        ReasoningEffort::ALL
            .iter()
            .map(|level| {
                InlineKeyboardButton::new(
                    mark(level.as_str(), *level == rec.reasoning_effort),
                    cb(&["reasoning_pick", level.as_str()]),
                )
            })
            .collect(),
    );
    rows.push(vec![InlineKeyboardButton::new(LABEL_BACK, cb(&["back"]))]);

    (text_html, InlineKeyboardMarkup::new(rows))
}

pub fn render_model_custom(
    rec: &SessionRecord,
    presets: &[String],
    notice: Option<&str>,
) -> Screen {
    let example = presets.first().map(String::as_str).unwrap_or("o3");
    let text_html = format!(
        "{}<b>Custom model</b>\n\n{}\n\nSend a model id (e.g. <code>{}</code>) or tap Back.",
        notice_html(notice),
        compact_info(rec),
        escape_html(example),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::new(
        LABEL_BACK,
        cb(&["back"]),
    )]]);
    (text_html, kb)
}

pub fn render_await_prompt(
    registry: &Registry,
    session_name: &str,
    run_mode: RunMode,
    notice: Option<&str>,
) -> Screen {
    let rec = registry.session(session_name);
    let model = rec
        .as_ref()
        .map(|r| r.model.clone())
        .unwrap_or_else(|| tether_core::DEFAULT_MODEL.to_string());
    let effort = rec
        .as_ref()
        .map(|r| r.reasoning_effort)
        .unwrap_or(tether_core::DEFAULT_REASONING_EFFORT);
    let path_line = rec
        .as_ref()
        .map(|r| format!("<code>{}</code>\n", escape_html(&r.path)))
        .unwrap_or_default();
    let mode_label = match run_mode {
        RunMode::Continue => "continue (resume)",
        RunMode::New => "new prompt",
    };

    let text_html = format!(
        "{}<b>Session:</b> <code>{}</code>\n<code>{}</code> <code>{}</code>\n{}\nSend the prompt as a message.\n\n<i>Mode:</i> {}",
        notice_html(notice),
        escape_html(session_name),
        escape_html(&model),
        escape_html(effort.as_str()),
        path_line,
        escape_html(mode_label),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("⚙️", cb(&["model"])),
        InlineKeyboardButton::new(LABEL_BACK, cb(&["back"])),
    ]]);
    (text_html, kb)
}
