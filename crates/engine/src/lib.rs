// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tether-engine: run orchestration — log sinks, the stream multiplexer, the
//! subprocess runner, and the session registry.

pub mod events;
pub mod log_sink;
pub mod log_view;
pub mod notice;
pub mod registry;
pub mod runner;
pub mod stream;

pub use log_sink::LogSink;
pub use log_view::{
    extract_last_agent_message, preview_from_stderr_log, preview_from_stdout_log, tail_text_file,
    PREVIEW_MAX_CHARS, TAIL_MAX_BYTES,
};
pub use notice::send_completion_notice;
pub use registry::{DeleteOutcome, PanelSync, Registry, RegistryError, RunHandle};
pub use runner::{
    running_keyboard, working_footer, working_footer_plain_len, RUN_START_WAIT_NOTE,
};
pub use stream::{Segment, SegmentKind, Stream, StreamConfig, EDIT_THROTTLE};
