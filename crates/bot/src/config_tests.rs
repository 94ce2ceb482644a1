// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    std::env::remove_var("TETHER_TOKEN");
    std::env::remove_var("TELEGRAM_BOT_TOKEN");
    std::env::remove_var("TETHER_ADMIN_ID");
}

#[test]
#[serial]
fn missing_token_is_an_error() {
    clear_env();
    assert!(matches!(Config::from_env(), Err(ConfigError::MissingToken)));
}

#[test]
#[serial]
fn token_and_admin_come_from_env() {
    clear_env();
    std::env::set_var("TETHER_TOKEN", "123:abc");
    std::env::set_var("TETHER_ADMIN_ID", "42");
    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.token, "123:abc");
    assert_eq!(config.admin_id, Some(42));
}

#[test]
#[serial]
fn fallback_token_variable_is_honored() {
    clear_env();
    std::env::set_var("TELEGRAM_BOT_TOKEN", "999:zzz");
    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.token, "999:zzz");
    assert_eq!(config.admin_id, None);
}

#[test]
#[serial]
fn malformed_admin_id_is_ignored() {
    clear_env();
    std::env::set_var("TETHER_TOKEN", "1:a");
    std::env::set_var("TETHER_ADMIN_ID", "not-a-number");
    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.admin_id, None);
}
