// SPDX-License-Identifier: MIT OR Apache-2.0
//! ludo-host
//!
//! Launching and supervising games: the [`Runner`] variants, the process
//! supervisor behind managed runners, the [`ProcessRegistry`] of running
//! games and the [`Launcher`] context tying them to a library.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod detached;
pub mod events;
pub mod launcher;
pub mod managed;
pub mod process;
pub mod registry;
pub mod runner;
pub mod supervisor;
pub mod url;

pub use detached::DetachedRunner;
pub use events::{EVENT_CHANNEL_CAPACITY, RunnerObserver};
pub use launcher::{LaunchSettings, Launcher, Toggled};
pub use managed::ManagedRunner;
pub use process::{ProcessInfo, ProcessStatus};
pub use registry::ProcessRegistry;
pub use runner::Runner;
pub use supervisor::{SupervisorSettings, SupervisorState};
pub use url::{SystemOpener, UrlOpener, UrlRunner, is_web_url};

use ludo_core::{GameId, LaunchError, LifecycleError, RunnerFault};
use ludo_store::StoreError;
use thiserror::Error;

/// Errors returned by a runner's `run()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// The launch failed; the `Error` event carrying the same fault was emitted.
    #[error(transparent)]
    Fault(RunnerFault),

    /// `run()` was called on a runner that is not idle. Nothing was emitted.
    #[error("runner cannot run: {0}")]
    InvalidState(#[source] LifecycleError),
}

impl RunnerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fault(fault) => fault.code(),
            Self::InvalidState(_) => "INVALID_STATE",
        }
    }

    /// The launch fault, if this is one.
    pub fn fault(&self) -> Option<&RunnerFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::InvalidState(_) => None,
        }
    }
}

/// Errors from [`Launcher`] operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// The game's launch parameters do not describe a command.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The library store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The runner failed to start.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// A tracked runner for the game is still running.
    #[error("game {0} is already running")]
    AlreadyRunning(GameId),
}

impl HostError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Launch(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Runner(e) => e.code(),
            Self::AlreadyRunning(_) => "ALREADY_RUNNING",
        }
    }
}
