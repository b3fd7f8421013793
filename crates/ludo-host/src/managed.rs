// SPDX-License-Identifier: MIT OR Apache-2.0
//! The managed process runner: spawned, supervised and stoppable.

use crate::RunnerError;
use crate::events::RunnerCore;
use crate::process::ProcessInfo;
use crate::supervisor::{SharedInfo, Spawned, StopRequest, Supervisor, SupervisorSettings, lock_info};
use ludo_core::{
    GameId, OutputStream, ProcessFailure, ResolvedCommand, RunnerFault, RunnerState,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Runner for a child process the launcher watches and can stop.
#[derive(Debug)]
pub struct ManagedRunner {
    pub(crate) core: Arc<RunnerCore>,
    command: ResolvedCommand,
    settings: SupervisorSettings,
    info: SharedInfo,
    control: Mutex<Option<mpsc::Sender<StopRequest>>>,
}

impl ManagedRunner {
    /// Label of this launch strategy.
    pub const NAME: &'static str = "Default Runner";

    /// Create an idle runner for `command`.
    pub fn new(game: GameId, command: ResolvedCommand, settings: SupervisorSettings) -> Self {
        let info = ProcessInfo::new(command.to_string());
        Self {
            core: Arc::new(RunnerCore::new(Self::NAME, game)),
            command,
            settings,
            info: Arc::new(Mutex::new(info)),
            control: Mutex::new(None),
        }
    }

    /// Command this runner executes.
    pub fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    /// Snapshot of the supervised process.
    pub fn process(&self) -> ProcessInfo {
        lock_info(&self.info).clone()
    }

    /// Spawn the process and return once the OS confirmed (or refused) it.
    ///
    /// On a failed spawn the `Error` event has already been emitted when
    /// this returns `Err(RunnerError::Fault)`.
    pub async fn run(self: &Arc<Self>) -> Result<(), RunnerError> {
        self.core
            .transition(RunnerState::Starting, "run requested")
            .map_err(RunnerError::InvalidState)?;
        info!(target: "ludo.runner", game = %self.core.game(), command = %self.command, "launching");

        let Spawned {
            supervisor,
            stdout,
            stderr,
        } = match Supervisor::spawn(&self.command, self.settings, Arc::clone(&self.info)).await {
            Ok(spawned) => spawned,
            Err(failure) => {
                let fault: RunnerFault = failure.into();
                self.core.finish(
                    RunnerState::Failed {
                        fault: fault.clone(),
                    },
                    "spawn failed",
                );
                return Err(RunnerError::Fault(fault));
            }
        };

        let pid = supervisor.pid();
        let (stop_tx, stop_rx) = mpsc::channel(1);
        *self.control.lock().unwrap_or_else(PoisonError::into_inner) = Some(stop_tx);
        self.core
            .started(format!("pid {pid}"))
            .map_err(RunnerError::InvalidState)?;

        if let Some(stdout) = stdout {
            tokio::spawn(forward_output(Arc::clone(&self.core), OutputStream::Stdout, stdout));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(forward_output(Arc::clone(&self.core), OutputStream::Stderr, stderr));
        }

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let exit = supervisor.supervise(stop_rx).await;
            runner
                .control
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            runner.core.finish(exit.state, "process ended");
            for reply in exit.replies {
                let _ = reply.send(());
            }
        });
        Ok(())
    }

    /// Request a graceful stop and wait until the runner has ended.
    ///
    /// Returns `false` without doing anything unless the runner is `Running`.
    pub async fn stop(&self) -> bool {
        let tx = {
            let control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(tx) = control.as_ref() else {
                return false;
            };
            if self
                .core
                .transition(RunnerState::Stopping, "stop requested")
                .is_err()
            {
                return false;
            }
            tx.clone()
        };

        let (reply, done) = oneshot::channel();
        if tx.send(StopRequest { reply }).await.is_err() {
            return false;
        }
        let _ = done.await;
        true
    }

    /// `true` while the process is alive.
    pub fn is_running(&self) -> bool {
        matches!(
            self.core.state(),
            RunnerState::Running | RunnerState::Stopping
        )
    }

    /// Wait for the terminal state.
    pub async fn wait(&self) -> RunnerState {
        self.core.wait_for(RunnerState::is_terminal).await
    }
}

/// Log and publish each line of `pipe` until EOF or a read error.
async fn forward_output(core: Arc<RunnerCore>, stream: OutputStream, pipe: impl AsyncRead + Unpin) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                match stream {
                    OutputStream::Stdout => info!(target: "ludo.game.stdout", game = %core.game(), "{line}"),
                    OutputStream::Stderr => warn!(target: "ludo.game.stderr", game = %core.game(), "{line}"),
                }
                core.output(stream, line.to_string());
            }
            Err(e) => {
                warn!(
                    target: "ludo.supervisor",
                    game = %core.game(),
                    ?stream,
                    error = %e,
                    "{}",
                    ProcessFailure::ReadError.message()
                );
                break;
            }
        }
    }
}
