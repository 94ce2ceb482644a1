// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File attachments: sanitized downloads into the session's working
//! directory, media-group debouncing, and the synthesized prompt.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tether_adapters::{Document, Message};
use tether_core::RunMode;
use tracing::warn;

use crate::ctx::{BotCtx, MediaGroup};
use crate::render::render_and_sync;
use crate::ui::state::Mode;

use super::text::schedule_prompt_run;
use super::{delete_user_message_best_effort, ensure_authorized};

/// Quiet window that closes a media-group burst.
pub(crate) const MEDIA_GROUP_DEBOUNCE: Duration = Duration::from_millis(800);

/// Longest basename written into a working directory.
const MAX_DOWNLOADED_FILENAME_LEN: usize = 180;

/// One attachment to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub preferred_name: Option<String>,
    pub default_stem: String,
    pub file_size: Option<u64>,
}

fn doc_ref(doc: &Document, type_hint: &str) -> AttachmentRef {
    let uniq = doc.file_unique_id.clone().filter(|u| !u.is_empty());
    AttachmentRef {
        default_stem: format!("{type_hint}_{}", uniq.as_deref().unwrap_or(&doc.file_id)),
        file_id: doc.file_id.clone(),
        file_unique_id: uniq,
        preferred_name: doc
            .file_name
            .clone()
            .filter(|name| !name.trim().is_empty()),
        file_size: doc.file_size,
    }
}

/// Extract the file-like attachments of a message. Photos pick the largest
/// size; every other kind maps straight through.
pub fn extract_message_attachments(message: &Message) -> Vec<AttachmentRef> {
    if let Some(photos) = &message.photo {
        if let Some(best) = photos.last() {
            let uniq = best.file_unique_id.clone().filter(|u| !u.is_empty());
            return vec![AttachmentRef {
                default_stem: format!("photo_{}", uniq.as_deref().unwrap_or(&best.file_id)),
                file_id: best.file_id.clone(),
                file_unique_id: uniq,
                preferred_name: None,
                file_size: best.file_size,
            }];
        }
        return Vec::new();
    }
    if let Some(doc) = &message.document {
        return vec![doc_ref(doc, "document")];
    }
    if let Some(doc) = &message.audio {
        return vec![doc_ref(doc, "audio")];
    }
    if let Some(doc) = &message.video {
        return vec![doc_ref(doc, "video")];
    }
    if let Some(doc) = &message.voice {
        return vec![doc_ref(doc, "voice")];
    }
    if let Some(doc) = &message.animation {
        return vec![doc_ref(doc, "animation")];
    }
    Vec::new()
}

/// Make a filename safe for the session root: no separators, no control
/// characters, length-capped with the extension preserved when possible.
pub fn sanitize_attachment_basename(name: &str) -> String {
    let mut base: String = name
        .trim()
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| match c {
            '/' | '\\' => '_',
            c if (c as u32) < 0x20 || c == '\u{7f}' => '_',
            c => c,
        })
        .collect();
    base = base.trim().to_string();
    if base.is_empty() || base == "." || base == ".." {
        return "file".to_string();
    }

    if base.chars().count() > MAX_DOWNLOADED_FILENAME_LEN {
        let path = Path::new(&base);
        let suffix = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        if !suffix.is_empty() && suffix.chars().count() < MAX_DOWNLOADED_FILENAME_LEN {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| base.clone());
            let keep = MAX_DOWNLOADED_FILENAME_LEN - suffix.chars().count();
            let clipped: String = stem.chars().take(keep).collect();
            base = format!("{clipped}{suffix}");
        } else {
            base = base.chars().take(MAX_DOWNLOADED_FILENAME_LEN).collect();
        }
    }
    base
}

/// Collision-avoidant destination: `name`, then `name_2` … `name_9999`,
/// then a timestamped fallback.
pub fn pick_unique_dest_path(dest_dir: &Path, basename: &str) -> PathBuf {
    let safe = sanitize_attachment_basename(basename);
    let candidate = dest_dir.join(&safe);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(&safe);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "file".to_string());
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for i in 2..10_000 {
        let candidate = dest_dir.join(format!("{stem}_{i}{suffix}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    dest_dir.join(format!("{stem}_{}{suffix}", tether_core::log_stamp()))
}

/// Download a message's attachments into the session root. Returns saved
/// basenames plus an optional user-facing notice about skipped files.
async fn download_attachments(
    ctx: &Arc<BotCtx>,
    message: &Message,
    session_root: &Path,
) -> Result<(Vec<String>, Option<String>), String> {
    if !session_root.is_dir() {
        return Err(format!(
            "Session directory not found: {}",
            session_root.display()
        ));
    }

    let refs = extract_message_attachments(message);
    if refs.is_empty() {
        return Ok((Vec::new(), None));
    }

    let max_bytes = tether_adapters::env::max_attachment_bytes();
    let mut saved: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for attachment in refs {
        if let (Some(limit), Some(size)) = (max_bytes, attachment.file_size) {
            if size > limit {
                skipped.push(
                    attachment
                        .preferred_name
                        .clone()
                        .unwrap_or_else(|| {
                            format!("{} (id:{})", attachment.default_stem, attachment.file_id)
                        }),
                );
                continue;
            }
        }

        let file = ctx
            .transport
            .get_file(&attachment.file_id)
            .await
            .map_err(|e| e.to_string())?;
        let suffix = file
            .file_path
            .as_deref()
            .and_then(|p| Path::new(p).extension())
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let preferred = attachment
            .preferred_name
            .clone()
            .unwrap_or_else(|| format!("{}{}", attachment.default_stem, suffix));
        let dest = pick_unique_dest_path(session_root, &preferred);
        ctx.transport
            .download_file(&file, &dest)
            .await
            .map_err(|e| e.to_string())?;
        saved.push(dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or(preferred));
    }

    let notice = match (max_bytes, skipped.is_empty()) {
        (Some(limit), false) => {
            let shown: Vec<String> = skipped.iter().take(6).cloned().collect();
            let more = if skipped.len() > 6 {
                format!(" (+{} more)", skipped.len() - 6)
            } else {
                String::new()
            };
            Some(format!(
                "Attachment too large (limit: {} MB). Skipped: {}{}",
                limit / (1024 * 1024),
                shown.join(", "),
                more,
            ))
        }
        _ => None,
    };

    Ok((saved, notice))
}

/// Synthesize the downstream prompt from the caption and the saved files.
pub fn build_prompt_with_files(user_text: &str, filenames: &[String]) -> String {
    let mut names: Vec<&str> = filenames
        .iter()
        .map(String::as_str)
        .filter(|n| !n.trim().is_empty())
        .collect();
    names.sort_unstable();
    names.dedup();
    let file_list = if names.is_empty() {
        "- (none)".to_string()
    } else {
        names
            .iter()
            .map(|n| format!("- {n}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let user_text = user_text.trim();
    if user_text.is_empty() {
        format!(
            "Files were saved into the root of this session's working directory (downloaded from the chat).\nTake note of them and list their names in your reply:\n{file_list}\n\nThere is no accompanying text from the user.\nIf the task/prompt is inside these files (text, PDF, images, etc.) — extract it and carry it out."
        )
    } else {
        format!(
            "Files were saved into the root of this session's working directory (downloaded from the chat).\nTake note of them and list their names in your reply:\n{file_list}\n\nThe user's message:\n{user_text}"
        )
    }
}

pub async fn on_attachment(ctx: &Arc<BotCtx>, message: &Message) {
    let chat_id = message.chat.id;
    if !ensure_authorized(ctx, message.from.as_ref().map(|u| u.id), chat_id).await {
        return;
    }
    delete_user_message_best_effort(ctx, &message.chat, message.message_id).await;

    let (ui_mode, session_name, run_mode) = ctx.ui.with(chat_id, |ui| {
        let run_mode = match ui.mode {
            Mode::Session => RunMode::Continue,
            Mode::AwaitPrompt => ui.await_prompt.map(|a| a.run_mode).unwrap_or(RunMode::New),
            _ => RunMode::Continue,
        };
        (ui.mode, ui.session.clone(), run_mode)
    });

    if !matches!(ui_mode, Mode::Session | Mode::AwaitPrompt) {
        ctx.ui
            .with(chat_id, |ui| ui.set_notice("Select a session first."));
        render_and_sync(ctx, chat_id).await;
        return;
    }

    let Some(session_name) = session_name.filter(|n| ctx.registry.has_session(n)) else {
        ctx.ui.with(chat_id, |ui| {
            ui.mode = Mode::Sessions;
            ui.set_notice("No session selected.");
        });
        render_and_sync(ctx, chat_id).await;
        return;
    };
    let Some(rec) = ctx.registry.session(&session_name) else {
        return;
    };

    let caption = message
        .caption
        .clone()
        .unwrap_or_default()
        .trim()
        .to_string();

    let (filenames, notice) =
        match download_attachments(ctx, message, Path::new(&rec.path)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(chat_id, session = session_name, error = %e, "attachment download failed");
                ctx.ui.with(chat_id, |ui| {
                    ui.set_notice(format!("Failed to download attachment: {e}"))
                });
                render_and_sync(ctx, chat_id).await;
                return;
            }
        };

    if let Some(notice) = notice {
        ctx.ui.with(chat_id, |ui| ui.set_notice(notice));
        if ui_mode == Mode::Session {
            render_and_sync(ctx, chat_id).await;
        }
    }
    if filenames.is_empty() {
        return;
    }

    // Media groups debounce into one prompt carrying the whole burst.
    if let Some(group_id) = message
        .media_group_id
        .clone()
        .filter(|id| !id.is_empty())
    {
        let is_new_group = {
            use std::collections::hash_map::Entry;
            let mut groups = ctx.media_groups.lock();
            match groups.entry(group_id.clone()) {
                Entry::Occupied(mut entry) => {
                    let group = entry.get_mut();
                    group.filenames.extend(filenames.clone());
                    if group.user_text.as_deref().map(str::trim).unwrap_or("").is_empty()
                        && !caption.is_empty()
                    {
                        group.user_text = Some(caption.clone());
                    }
                    group.last_update = Instant::now();
                    false
                }
                Entry::Vacant(entry) => {
                    entry.insert(MediaGroup {
                        session_name: session_name.clone(),
                        ui_mode,
                        run_mode,
                        user_text: (!caption.is_empty()).then(|| caption.clone()),
                        filenames: filenames.clone(),
                        last_update: Instant::now(),
                    });
                    true
                }
            }
        };
        if is_new_group {
            let ctx = Arc::clone(ctx);
            tokio::spawn(async move {
                flush_media_group(&ctx, chat_id, &group_id).await;
            });
        }
        return;
    }

    let prompt = build_prompt_with_files(&caption, &filenames);
    schedule_prompt_run(ctx, chat_id, &session_name, &prompt, ui_mode, run_mode).await;
}

/// Wait for the burst to go quiet, then run the coalesced prompt.
async fn flush_media_group(ctx: &Arc<BotCtx>, chat_id: i64, group_id: &str) {
    loop {
        tokio::time::sleep(MEDIA_GROUP_DEBOUNCE).await;

        let flushed = {
            let mut groups = ctx.media_groups.lock();
            let Some(group) = groups.get(group_id) else {
                return;
            };
            if group.last_update.elapsed() < MEDIA_GROUP_DEBOUNCE {
                None
            } else {
                groups.remove(group_id)
            }
        };

        let Some(group) = flushed else {
            continue;
        };
        let prompt = build_prompt_with_files(
            group.user_text.as_deref().unwrap_or(""),
            &group.filenames,
        );
        schedule_prompt_run(
            ctx,
            chat_id,
            &group.session_name,
            &prompt,
            group.ui_mode,
            group.run_mode,
        )
        .await;
        return;
    }
}

#[cfg(test)]
#[path = "attachments_tests.rs"]
mod tests;
