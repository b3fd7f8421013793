// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot of a supervised game process.

use crate::supervisor::SupervisorState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime status of a supervised process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessStatus {
    /// The process has not been started yet.
    NotStarted,
    /// The process is currently running.
    Running {
        /// OS process identifier.
        pid: u32,
    },
    /// The process exited with the given code.
    Exited {
        /// Exit code returned by the process.
        code: i32,
    },
    /// The process was ended by a signal other than our force kill.
    Signaled {
        /// Signal number.
        signal: i32,
    },
    /// The process ignored the terminate request and was force killed.
    Killed,
    /// The process could not be confirmed started or gone in time.
    TimedOut,
}

/// Tracks the lifecycle of one supervised process.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Command line, shell-quoted.
    pub command: String,
    /// OS process id, once spawned.
    pub pid: Option<u32>,
    /// Supervisor phase.
    pub phase: SupervisorState,
    /// Current status of the process.
    pub status: ProcessStatus,
    /// When the process was started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the process ended (exited, killed, or timed out).
    pub ended_at: Option<DateTime<Utc>>,
}

impl ProcessInfo {
    /// Create a new `ProcessInfo` in the `NotStarted` state.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            pid: None,
            phase: SupervisorState::NotStarted,
            status: ProcessStatus::NotStarted,
            started_at: None,
            ended_at: None,
        }
    }

    /// Returns `true` if the process is currently running.
    pub fn is_running(&self) -> bool {
        matches!(self.status, ProcessStatus::Running { .. })
    }

    /// Returns `true` once the process has ended in any way.
    pub fn is_terminated(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Wall-clock run time. `None` if never started; measured to now while running.
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - start).to_std().ok()
    }

    pub(crate) fn mark_running(&mut self, pid: u32) {
        self.pid = Some(pid);
        self.status = ProcessStatus::Running { pid };
        self.phase = SupervisorState::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn mark_ended(&mut self, status: Option<ProcessStatus>) {
        if let Some(status) = status {
            self.status = status;
        }
        self.phase = SupervisorState::Exited;
        self.ended_at = Some(Utc::now());
    }
}
