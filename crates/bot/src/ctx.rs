// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared handler context.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tether_adapters::ChatTransport;
use tether_core::RunMode;
use tether_engine::Registry;
use tokio::sync::Notify;

use crate::panel::PanelRenderer;
use crate::ui::state::{Mode, UiRegistry};

/// One media-group burst being debounced into a single prompt.
pub struct MediaGroup {
    pub session_name: String,
    pub ui_mode: Mode,
    pub run_mode: RunMode,
    pub user_text: Option<String>,
    pub filenames: Vec<String>,
    pub last_update: Instant,
}

/// Everything a handler needs, shared behind one `Arc`.
pub struct BotCtx {
    pub registry: Registry,
    pub transport: Arc<dyn ChatTransport>,
    pub panel: PanelRenderer,
    pub ui: UiRegistry,
    /// In-process restart gate; the shell re-executes the image when set.
    pub restart: Notify,
    pub model_presets: Vec<String>,
    pub media_groups: Mutex<HashMap<String, MediaGroup>>,
}

impl BotCtx {
    pub fn new(registry: Registry, model_presets: Vec<String>) -> Arc<BotCtx> {
        let transport = registry.transport();
        let panel = PanelRenderer::new(registry.clone());
        Arc::new(BotCtx {
            registry,
            transport,
            panel,
            ui: UiRegistry::new(),
            restart: Notify::new(),
            model_presets,
            media_groups: Mutex::new(HashMap::new()),
        })
    }
}
