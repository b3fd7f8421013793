// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner lifecycle state machine. Tracks and enforces valid state transitions.

use crate::RunnerFault;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lifecycle state of a runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunnerState {
    /// Constructed, `run()` not yet called.
    Idle,
    /// `run()` called, waiting for the OS to confirm the spawn.
    Starting,
    /// The launch succeeded.
    Running,
    /// A stop was requested and the process has not exited yet.
    Stopping,
    /// The process exited.
    Terminated {
        /// Exit code reported for the process.
        exit_code: i32,
    },
    /// The runner hit an unrecoverable error.
    Failed {
        /// What went wrong.
        fault: RunnerFault,
    },
}

impl RunnerState {
    /// Returns `true` for `Terminated` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated { .. } | Self::Failed { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Terminated { .. } => "terminated",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminated { exit_code } => write!(f, "terminated (exit code {exit_code})"),
            Self::Failed { fault } => write!(f, "failed ({fault})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Record of a single lifecycle state transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LifecycleTransition {
    /// State before the transition.
    pub from: RunnerState,
    /// State after the transition.
    pub to: RunnerState,
    /// RFC 3339 timestamp of when the transition occurred.
    pub timestamp: String,
    /// Optional human-readable reason for the transition.
    pub reason: Option<String>,
}

/// Errors produced by [`RunnerLifecycle`] when a transition is invalid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The requested transition is not allowed by the state machine.
    #[error("invalid lifecycle transition from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        /// Current state.
        from: RunnerState,
        /// Requested target state.
        to: RunnerState,
    },
}

/// Owns a runner's state and enforces
/// `Idle → Starting → Running → Stopping → Terminated | Failed`.
#[derive(Debug)]
pub struct RunnerLifecycle {
    state: RunnerState,
    history: Vec<LifecycleTransition>,
    running_since: Option<Instant>,
}

impl RunnerLifecycle {
    /// Create a lifecycle in [`RunnerState::Idle`].
    pub fn new() -> Self {
        Self {
            state: RunnerState::Idle,
            history: Vec::new(),
            running_since: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    /// Attempt to move to `to`.
    pub fn transition(
        &mut self,
        to: RunnerState,
        reason: Option<String>,
    ) -> Result<(), LifecycleError> {
        if !self.can_transition(&to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.state.clone(),
                to,
            });
        }

        if to == RunnerState::Running && self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }

        let from = std::mem::replace(&mut self.state, to.clone());
        self.history.push(LifecycleTransition {
            from,
            to,
            timestamp: chrono::Utc::now().to_rfc3339(),
            reason,
        });
        Ok(())
    }

    /// Returns `true` if moving from the current state to `to` is valid.
    ///
    /// Terminal states accept nothing; `Failed` is reachable from every
    /// other state.
    pub fn can_transition(&self, to: &RunnerState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if matches!(to, RunnerState::Failed { .. }) {
            return true;
        }

        matches!(
            (&self.state, to),
            (RunnerState::Idle, RunnerState::Starting)
                | (RunnerState::Starting, RunnerState::Running)
                | (RunnerState::Running, RunnerState::Stopping)
                | (RunnerState::Running, RunnerState::Terminated { .. })
                | (RunnerState::Stopping, RunnerState::Terminated { .. })
        )
    }

    /// Full history of state transitions.
    pub fn history(&self) -> &[LifecycleTransition] {
        &self.history
    }

    /// Time since the runner entered [`RunnerState::Running`].
    pub fn uptime(&self) -> Option<Duration> {
        self.running_since.map(|t| t.elapsed())
    }
}

impl Default for RunnerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
