// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Home, session list, and the new-session wizard screens.

use tether_adapters::{InlineKeyboardButton, InlineKeyboardMarkup};
use tether_core::{cb, shorten_path};
use tether_engine::Registry;

use super::{notice_html, notice_code_html, status_emoji, Screen, LABEL_BACK};
use crate::ui::state::UiState;

const BLURB: &str = "<b>tether</b> is a lightweight session manager for Codex CLI.";

/// Width budget for path preset button labels.
const PRESET_LABEL_WIDTH: usize = 34;

pub fn render_home(registry: &Registry, notice: Option<&str>) -> Screen {
    let admin_note = if registry.admin_id().is_none() {
        "\n\n<i>Warning:</i> this bot is running without a configured admin id — anyone who finds it can control it."
    } else {
        ""
    };

    let text_html = format!(
        "{}{BLURB}\n\nIt keeps this chat clean by editing a single panel message and deleting your messages.\n\nUse the buttons below to manage sessions, pick working directories, and run prompts.{admin_note}",
        notice_html(notice),
    );
    let kb = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::new("📂", cb(&["sessions"])),
        InlineKeyboardButton::new("➕", cb(&["new"])),
    ]]);
    (text_html, kb)
}

pub fn render_sessions_list(
    registry: &Registry,
    ui: &mut UiState,
    notice: Option<&str>,
) -> Screen {
    let sessions = registry.sessions_sorted();
    ui.sess_list = sessions.iter().map(|rec| rec.name.clone()).collect();

    let text_html = format!("{}{BLURB}\n\nChoose or create session:", notice_html(notice));

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for (i, rec) in sessions.iter().enumerate() {
        let label = format!("{} {}", status_emoji(rec), rec.name);
        rows.push(vec![InlineKeyboardButton::new(
            label,
            cb(&["sess", &i.to_string()]),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::new("➕", cb(&["new"]))]);
    rows.push(vec![InlineKeyboardButton::new("🔄", cb(&["restart"]))]);

    (text_html, InlineKeyboardMarkup::new(rows))
}

pub fn render_new_name(registry: &Registry, ui: &mut UiState, notice: Option<&str>) -> Screen {
    let auto_name = registry.next_auto_session_name();
    ui.auto_name = Some(auto_name.clone());

    let text_html = format!(
        "{}<b>Step 1/2 — Name</b>\n\nSend a session name: <code>a-zA-Z0-9._-</code>.\nOr tap the suggested name below.",
        notice_html(notice),
    );
    let kb = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::new(auto_name, cb(&["new_auto"]))],
        vec![InlineKeyboardButton::new(LABEL_BACK, cb(&["back"]))],
    ]);
    (text_html, kb)
}

pub fn render_new_path(
    registry: &Registry,
    notice: Option<&str>,
    notice_code: Option<&str>,
) -> Screen {
    let text_html = format!(
        "{}<b>Step 2/2 — Path</b>\n\n{}Send a directory path, or choose a preset below.\n\n<i>Tip: you can use <code>~/</code> as your home directory.</i>\n<i>For example: <code>~/projects/my-app</code></i>\n\n<b>Click on path to copy!</b>",
        notice_html(notice),
        notice_code_html(notice_code),
    );

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for (i, preset) in registry.path_presets().iter().enumerate() {
        rows.push(vec![InlineKeyboardButton::new(
            format!("📁 {}", shorten_path(preset, PRESET_LABEL_WIDTH)),
            cb(&["path_pick", &i.to_string()]),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::new("⚙️", cb(&["paths"]))]);
    rows.push(vec![InlineKeyboardButton::new(LABEL_BACK, cb(&["back"]))]);

    (text_html, InlineKeyboardMarkup::new(rows))
}
