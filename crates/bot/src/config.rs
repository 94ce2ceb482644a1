// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration from the environment.

use tether_storage::RuntimePaths;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing bot token; set TETHER_TOKEN or TELEGRAM_BOT_TOKEN")]
    MissingToken,
}

/// Everything the shell needs to start.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    /// Fixed owner id; when absent the first user seen is captured.
    pub admin_id: Option<i64>,
    pub paths: RuntimePaths,
}

impl Config {
    /// Read `TETHER_TOKEN` / `TELEGRAM_BOT_TOKEN`, `TETHER_ADMIN_ID`, and
    /// the runtime dir override.
    pub fn from_env() -> Result<Config, ConfigError> {
        let token = ["TETHER_TOKEN", "TELEGRAM_BOT_TOKEN"]
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let admin_id = std::env::var("TETHER_ADMIN_ID")
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        Ok(Config {
            token,
            admin_id,
            paths: RuntimePaths::from_env(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
