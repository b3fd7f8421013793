// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fire-and-forget process runner.

use crate::RunnerError;
use crate::events::RunnerCore;
use ludo_core::{GameId, ProcessFailure, ResolvedCommand, RunnerFault, RunnerState};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// Runner that spawns a process in its own group and forgets it.
///
/// Success is reported as soon as the spawn call returns. The process is
/// never stopped or polled.
#[derive(Debug)]
pub struct DetachedRunner {
    pub(crate) core: RunnerCore,
    command: ResolvedCommand,
}

impl DetachedRunner {
    /// Label of this launch strategy.
    pub const NAME: &'static str = "Detached Runner";

    /// Create an idle runner for `command`.
    pub fn new(game: GameId, command: ResolvedCommand) -> Self {
        Self {
            core: RunnerCore::new(Self::NAME, game),
            command,
        }
    }

    /// Command this runner executes.
    pub fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    /// Spawn the process detached from the launcher.
    pub async fn run(&self) -> Result<(), RunnerError> {
        self.core
            .transition(RunnerState::Starting, "run requested")
            .map_err(RunnerError::InvalidState)?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        match cmd.spawn() {
            Ok(child) => {
                info!(
                    target: "ludo.runner",
                    game = %self.core.game(),
                    pid = child.id(),
                    command = %self.command,
                    "launched detached"
                );
                self.core
                    .started("spawned detached")
                    .map_err(RunnerError::InvalidState)
            }
            Err(e) => {
                warn!(target: "ludo.runner", game = %self.core.game(), error = %e, "detached spawn failed");
                let fault = RunnerFault::from(ProcessFailure::FailedToStart);
                self.core.finish(
                    RunnerState::Failed {
                        fault: fault.clone(),
                    },
                    e.to_string(),
                );
                Err(RunnerError::Fault(fault))
            }
        }
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
