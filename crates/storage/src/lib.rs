// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-storage: durable state document, runtime paths, legacy migration

pub mod migrate;
pub mod paths;
pub mod state;
pub mod store;

pub use migrate::maybe_migrate_runtime_files;
pub use paths::RuntimePaths;
pub use state::{StateSnapshot, STATE_VERSION};
pub use store::{StateStore, StoreError};
