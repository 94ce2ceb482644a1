// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-streaming screen renderers. Every function returns the HTML body and
//! inline keyboard for one screen; [`render_current`] dispatches on the
//! chat's mode.

mod home;
mod paths;
mod session;
mod settings;

pub use home::{render_home, render_new_name, render_new_path, render_sessions_list};
pub use paths::{
    render_confirm_delete, render_confirm_mkdir, render_confirm_stop, render_paths,
    render_paths_add,
};
pub use session::{
    build_running_header_html, build_running_header_plain_len, render_logs_view,
    render_session_view, status_emoji, stop_confirm_keyboard, STOP_CONFIRM_QUESTION,
};
pub use settings::{render_await_prompt, render_model, render_model_custom};

use tether_adapters::InlineKeyboardMarkup;
use tether_engine::Registry;

use crate::ui::state::{Mode, UiState};

/// Back-arrow label shared by most screens.
pub(crate) const LABEL_BACK: &str = "⬅️";

/// One rendered screen: HTML body plus keyboard.
pub type Screen = (String, InlineKeyboardMarkup);

pub(crate) fn notice_html(notice: Option<&str>) -> String {
    match notice {
        Some(text) if !text.is_empty() => {
            format!("<i>{}</i>\n\n", tether_core::escape_html(text))
        }
        _ => String::new(),
    }
}

pub(crate) fn notice_code_html(notice_code: Option<&str>) -> String {
    match notice_code {
        Some(text) if !text.is_empty() => {
            format!("<b>Path:</b> <code>{}</code>\n\n", tether_core::escape_html(text))
        }
        _ => String::new(),
    }
}

/// Render the chat's current screen, consuming its one-shot notices.
pub fn render_current(registry: &Registry, presets: &[String], ui: &mut UiState) -> Screen {
    let (notice, notice_code) = ui.take_notices();
    let notice = notice.as_deref();
    let notice_code = notice_code.as_deref();

    match ui.mode {
        Mode::Home => render_home(registry, notice),
        Mode::Sessions => render_sessions_list(registry, ui, notice),
        Mode::NewName => render_new_name(registry, ui, notice),
        Mode::NewPath => render_new_path(registry, notice, notice_code),
        Mode::Paths => render_paths(registry, notice),
        Mode::PathsAdd => render_paths_add(notice, notice_code),
        Mode::ConfirmMkdir => render_confirm_mkdir(ui, notice),
        Mode::ConfirmDelete => match ui.session.as_deref().and_then(|n| registry.session(n)) {
            Some(rec) => render_confirm_delete(&rec, notice),
            None => render_sessions_list(registry, ui, Some("Unknown session.")),
        },
        Mode::ConfirmStop => match ui.session.clone() {
            Some(name) if registry.has_session(&name) => render_confirm_stop(&name, notice),
            _ => render_sessions_list(registry, ui, Some("No session selected.")),
        },
        Mode::Model => match ui.session.as_deref().and_then(|n| registry.session(n)) {
            Some(rec) => render_model(&rec, presets, notice),
            None => render_sessions_list(registry, ui, Some("Unknown session.")),
        },
        Mode::ModelCustom => match ui.session.as_deref().and_then(|n| registry.session(n)) {
            Some(rec) => render_model_custom(&rec, presets, notice),
            None => render_sessions_list(registry, ui, Some("No session selected.")),
        },
        Mode::Logs => match ui.session.clone() {
            Some(name) if registry.has_session(&name) => {
                render_logs_view(registry, &name, notice)
            }
            _ => render_sessions_list(registry, ui, Some("No session selected.")),
        },
        Mode::AwaitPrompt => match ui.session.clone() {
            Some(name) if registry.has_session(&name) => {
                let run_mode = ui
                    .await_prompt
                    .map(|a| a.run_mode)
                    .unwrap_or(tether_core::RunMode::New);
                render_await_prompt(registry, &name, run_mode, notice)
            }
            _ => render_sessions_list(registry, ui, Some("No session selected.")),
        },
        Mode::Session => match ui.session.clone() {
            Some(name) if registry.has_session(&name) => {
                render_session_view(registry, &name, notice)
            }
            _ => render_sessions_list(registry, ui, notice),
        },
    }
}
