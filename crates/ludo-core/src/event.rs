// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lifecycle signals emitted by runners.

use crate::RunnerFault;
use serde::{Deserialize, Serialize};

/// Which output pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    /// Child standard output.
    Stdout,
    /// Child standard error.
    Stderr,
}

/// A lifecycle signal from a runner.
///
/// `Started` or `Error` comes first; stoppable runners later emit exactly
/// one `Stopped` or `Error`. `Output` is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunnerEvent {
    /// The launch succeeded.
    Started,
    /// The process ended.
    Stopped {
        /// Exit code (`128 + signal` for a process stopped by a signal).
        exit_code: i32,
    },
    /// The launch or the running process failed.
    Error {
        /// What went wrong.
        fault: RunnerFault,
    },
    /// A line of child output.
    Output {
        /// Source pipe.
        stream: OutputStream,
        /// Line without its trailing newline.
        line: String,
    },
}

impl RunnerEvent {
    /// Returns `true` for `Stopped` and `Error`, after which nothing else is emitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped { .. } | Self::Error { .. })
    }
}
