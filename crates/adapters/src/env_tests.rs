// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn env_flag_accepts_truthy_spellings() {
    for val in ["1", "true", "YES", " on "] {
        std::env::set_var("TETHER_TEST_FLAG", val);
        assert!(env_flag("TETHER_TEST_FLAG"), "value {val:?}");
    }
    for val in ["0", "false", "off", ""] {
        std::env::set_var("TETHER_TEST_FLAG", val);
        assert!(!env_flag("TETHER_TEST_FLAG"), "value {val:?}");
    }
    std::env::remove_var("TETHER_TEST_FLAG");
    assert!(!env_flag("TETHER_TEST_FLAG"));
}

#[test]
#[serial]
fn codex_bin_defaults_and_overrides() {
    std::env::remove_var("TETHER_CODEX_BIN");
    assert_eq!(codex_bin(), "codex");
    std::env::set_var("TETHER_CODEX_BIN", "/opt/bin/claudeless");
    assert_eq!(codex_bin(), "/opt/bin/claudeless");
    std::env::set_var("TETHER_CODEX_BIN", "   ");
    assert_eq!(codex_bin(), "codex");
    std::env::remove_var("TETHER_CODEX_BIN");
}

#[test]
#[serial]
fn sandbox_mode_rejects_unknown_values() {
    std::env::set_var("TETHER_SANDBOX", "read-only");
    assert_eq!(sandbox_mode(), "read-only");
    std::env::set_var("TETHER_SANDBOX", "yolo");
    assert_eq!(sandbox_mode(), "workspace-write");
    std::env::remove_var("TETHER_SANDBOX");
    assert_eq!(sandbox_mode(), "workspace-write");
}

#[test]
#[serial]
fn approval_policy_rejects_unknown_values() {
    std::env::set_var("TETHER_APPROVAL_POLICY", "on-failure");
    assert_eq!(approval_policy(), "on-failure");
    std::env::set_var("TETHER_APPROVAL_POLICY", "whatever");
    assert_eq!(approval_policy(), "never");
    std::env::remove_var("TETHER_APPROVAL_POLICY");
}

#[test]
#[serial]
fn max_attachment_bytes_parses_megabytes() {
    std::env::set_var("TETHER_MAX_ATTACHMENT_MB", "3");
    assert_eq!(max_attachment_bytes(), Some(3 * 1024 * 1024));
    std::env::set_var("TETHER_MAX_ATTACHMENT_MB", "0");
    assert_eq!(max_attachment_bytes(), None);
    std::env::set_var("TETHER_MAX_ATTACHMENT_MB", "abc");
    assert_eq!(max_attachment_bytes(), None);
    std::env::remove_var("TETHER_MAX_ATTACHMENT_MB");
    assert_eq!(max_attachment_bytes(), None);
}
