// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path preset management and confirmation screens.

use tether_adapters::{InlineKeyboardButton, InlineKeyboardMarkup};
use tether_core::{cb, escape_html, SessionRecord};
use tether_engine::Registry;

use super::{notice_code_html, notice_html, Screen, LABEL_BACK};
use crate::ui::state::UiState;

pub fn render_paths(registry: &Registry, notice: Option<&str>) -> Screen {
    let presets = registry.path_presets();

    let mut lines = vec![
        "<b>Paths presets</b>".to_string(),
        String::new(),
        "These appear as quick buttons in the New session wizard.".to_string(),
        String::new(),
    ];
    if presets.is_empty() {
        lines.push("<i>No presets yet.</i>".to_string());
    } else {
        for (i, preset) in presets.iter().enumerate() {
            lines.push(format!("{}. <code>{}</code>", i + 1, escape_html(preset)));
        }
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    rows.push(vec![InlineKeyboardButton::new("➕", cb(&["paths_add"]))]);
    let delete_buttons: Vec<InlineKeyboardButton> = presets
        .iter()
        .enumerate()
        .map(|(i, _)| InlineKeyboardButton::new(format!("🗑 #{}", i + 1), cb(&["path_del", &i.to_string()])))
        .collect();
    for chunk in delete_buttons.chunks(3) {
        rows.push(chunk.to_vec());
    }
    rows.push(vec![InlineKeyboardButton::new(LABEL_BACK, cb(&["back"]))]);

    let text_html = format!("{}{}", notice_html(notice), lines.join("\n"));
    (text_html, InlineKeyboardMarkup::new(rows))
}

pub fn render_paths_add(notice: Option<&str>, notice_code: Option<&str>) -> Screen {
    let text_html = format!(
        "{}<b>Add path preset</b>\n\n{}Send a directory path. I will validate it and add it to presets.\n\n<i>Tip: you can use <code>~/</code> as your home directory.</i>\n<i>For example: <code>~/projects/my-app</code></i>\n\n<b>Click on path to copy!</b>",
        notice_html(notice),
        notice_code_html(notice_code),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::new(
        LABEL_BACK,
        cb(&["back"]),
    )]]);
    (text_html, kb)
}

pub fn render_confirm_delete(rec: &SessionRecord, notice: Option<&str>) -> Screen {
    let text_html = format!(
        "{}<b>Delete session?</b>\n\nSession: <code>{}</code>\nPath: <code>{}</code>\n\n<b>This will delete only bot artifacts</b> (state + logs).\n<b>Your project directory will NOT be deleted.</b>",
        notice_html(notice),
        escape_html(&rec.name),
        escape_html(&rec.path),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("✅", cb(&["delete_yes"])),
        InlineKeyboardButton::new("❌", cb(&["delete_no"])),
    ]]);
    (text_html, kb)
}

pub fn render_confirm_mkdir(ui: &UiState, notice: Option<&str>) -> Screen {
    let path = ui.mkdir.as_ref().map(|draft| draft.path.as_str());

    let Some(path) = path.filter(|p| !p.is_empty()) else {
        let text_html = format!(
            "{}<b>Create directory?</b>\n\n<i>No pending directory.</i>",
            notice_html(notice),
        );
        let kb = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::new(
            LABEL_BACK,
            cb(&["back"]),
        )]]);
        return (text_html, kb);
    };

    let text_html = format!(
        "{}<b>Create directory?</b>\n\n<code>{}</code>\n\nThis folder doesn't exist. Create it (including parents)?",
        notice_html(notice),
        escape_html(path),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("✅", cb(&["mkdir_yes"])),
        InlineKeyboardButton::new("❌", cb(&["mkdir_no"])),
    ]]);
    (text_html, kb)
}

pub fn render_confirm_stop(session_name: &str, notice: Option<&str>) -> Screen {
    let text_html = format!(
        "{}<b>Stop run?</b>\n\nSession: <code>{}</code>\n\nThis will interrupt the current run.",
        notice_html(notice),
        escape_html(session_name),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("✅", cb(&["stop_yes"])),
        InlineKeyboardButton::new("❌", cb(&["stop_no"])),
    ]]);
    (text_html, kb)
}
