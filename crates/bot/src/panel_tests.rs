// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tether_adapters::RecordingTransport;
use tether_storage::{RuntimePaths, StateStore};

fn setup() -> (PanelRenderer, Registry, RecordingTransport, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let transport = RecordingTransport::new();
    let store = StateStore::new(RuntimePaths::isolated(tmp.path()));
    let registry = Registry::new(store, std::sync::Arc::new(transport.clone()), None);
    (PanelRenderer::new(registry.clone()), registry, transport, tmp)
}

#[tokio::test]
async fn ensure_panel_sends_placeholder_once_and_binds() {
    let (panel, registry, transport, _tmp) = setup();

    let first = panel.ensure_panel(7).await.unwrap();
    assert_eq!(registry.panel_message_id(7), Some(first));
    assert_eq!(transport.sends().len(), 1);
    assert!(transport.sends()[0].text.contains("Loading…"));

    let second = panel.ensure_panel(7).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(transport.sends().len(), 1);
}

#[tokio::test]
async fn html_edit_happy_path() {
    let (panel, _registry, transport, _tmp) = setup();
    let id = panel
        .render_to_message(7, 99, "<b>hi</b>", None, true)
        .await;
    assert_eq!(id, 99);
    let edit = transport.last_edit().unwrap();
    assert!(edit.html);
    assert_eq!(edit.text, "<b>hi</b>");
}

#[tokio::test]
async fn not_modified_counts_as_success() {
    let (panel, _registry, transport, _tmp) = setup();
    transport.push_edit_error(TransportError::NotModified);
    let id = panel.render_to_message(7, 99, "same", None, true).await;
    assert_eq!(id, 99);
    assert_eq!(transport.sends().len(), 0);
}

#[tokio::test]
async fn rate_limit_retries_the_html_edit() {
    let (panel, _registry, transport, _tmp) = setup();
    transport.push_edit_error(TransportError::RateLimited {
        retry_after: Duration::from_millis(5),
    });
    let id = panel.render_to_message(7, 99, "<b>x</b>", None, true).await;
    assert_eq!(id, 99);
    assert_eq!(transport.edits().len(), 1);
}

#[tokio::test]
async fn too_long_degrades_to_trimmed_code_block() {
    let (panel, _registry, transport, _tmp) = setup();
    transport.push_edit_error(TransportError::TooLong);
    let id = panel
        .render_to_message(7, 99, "<b>very long</b>", None, true)
        .await;
    assert_eq!(id, 99);
    let edit = transport.last_edit().unwrap();
    assert!(edit.text.starts_with("<pre><code>"));
    assert!(edit.text.contains("very long"));
}

#[tokio::test]
async fn parse_entities_degrades_to_plain_text() {
    let (panel, _registry, transport, _tmp) = setup();
    transport.push_edit_error(TransportError::ParseEntities("broken".into()));
    let id = panel
        .render_to_message(7, 99, "<b>bold</b> body", None, true)
        .await;
    assert_eq!(id, 99);
    let edit = transport.last_edit().unwrap();
    assert!(!edit.html);
    assert_eq!(edit.text, "bold body");
}

#[tokio::test]
async fn gone_message_is_replaced_and_rebound() {
    let (panel, registry, transport, _tmp) = setup();
    registry.set_panel_message_id(7, 99).await;
    transport.push_edit_error(TransportError::CannotEdit("message to edit not found".into()));

    let id = panel.render_to_message(7, 99, "<b>x</b>", None, true).await;
    assert_ne!(id, 99);
    assert_eq!(registry.panel_message_id(7), Some(id));
    assert_eq!(transport.sends().len(), 1);
    assert!(transport.sends()[0].html);
}

#[tokio::test]
async fn replacement_without_rebind_keeps_the_binding() {
    let (panel, registry, transport, _tmp) = setup();
    registry.set_panel_message_id(7, 99).await;
    transport.push_edit_error(TransportError::CannotEdit("chat not found".into()));

    let id = panel.render_to_message(7, 99, "x", None, false).await;
    assert_ne!(id, 99);
    assert_eq!(registry.panel_message_id(7), Some(99));
    let _ = transport;
}
