// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ownership of one managed child process, from spawn to reap.
//!
//! The supervisor walks `NotStarted → Spawning → Running → Stopping →
//! Exited`. A stop request sends a graceful terminate, waits up to the kill
//! timeout, then force kills and waits (bounded by the kill-confirm
//! timeout when one is configured) for the OS to report the process gone.

use crate::process::{ProcessInfo, ProcessStatus};
use ludo_config::LauncherConfig;
use ludo_core::{ProcessFailure, ResolvedCommand, RunnerState};
use serde::{Deserialize, Serialize};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Phase of a process supervisor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Nothing spawned yet.
    #[default]
    NotStarted,
    /// Waiting for the OS to confirm the spawn.
    Spawning,
    /// The process is alive.
    Running,
    /// Terminate sent, waiting for exit.
    Stopping,
    /// The process is gone.
    Exited,
}

/// Timeouts applied by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Wait for graceful exit after terminate before force killing.
    pub kill_timeout: Duration,
    /// Bound on waiting for the OS to confirm a spawn.
    pub start_timeout: Duration,
    /// Bound on waiting for exit after a force kill; `None` waits forever.
    pub kill_confirm_timeout: Option<Duration>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from(&LauncherConfig::default())
    }
}

impl From<&LauncherConfig> for SupervisorSettings {
    fn from(config: &LauncherConfig) -> Self {
        Self {
            kill_timeout: config.kill_timeout(),
            start_timeout: config.start_timeout(),
            kill_confirm_timeout: config.kill_confirm_timeout(),
        }
    }
}

pub(crate) type SharedInfo = Arc<Mutex<ProcessInfo>>;

pub(crate) fn lock_info(info: &SharedInfo) -> MutexGuard<'_, ProcessInfo> {
    info.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ask the supervisor to stop; `reply` fires once the runner has ended.
pub(crate) struct StopRequest {
    pub(crate) reply: oneshot::Sender<()>,
}

pub(crate) struct Spawned {
    pub(crate) supervisor: Supervisor,
    pub(crate) stdout: Option<ChildStdout>,
    pub(crate) stderr: Option<ChildStderr>,
}

/// How the process ended, plus stop requesters waiting on that.
pub(crate) struct Exit {
    pub(crate) state: RunnerState,
    pub(crate) replies: Vec<oneshot::Sender<()>>,
}

pub(crate) struct Supervisor {
    child: Child,
    pid: u32,
    settings: SupervisorSettings,
    info: SharedInfo,
    started: Instant,
}

impl Supervisor {
    /// Spawn `command` with piped output and no stdin.
    pub(crate) async fn spawn(
        command: &ResolvedCommand,
        settings: SupervisorSettings,
        info: SharedInfo,
    ) -> Result<Spawned, ProcessFailure> {
        lock_info(&info).phase = SupervisorState::Spawning;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut task = tokio::task::spawn_blocking(move || cmd.spawn());
        let spawned = match timeout(settings.start_timeout, &mut task).await {
            Ok(Ok(Ok(child))) => Ok(child),
            Ok(Ok(Err(e))) => {
                warn!(target: "ludo.supervisor", program = %command.program, error = %e, "spawn failed");
                Err(ProcessFailure::FailedToStart)
            }
            Ok(Err(e)) => {
                warn!(target: "ludo.supervisor", program = %command.program, error = %e, "spawn task failed");
                Err(ProcessFailure::FailedToStart)
            }
            Err(_) => {
                error!(
                    target: "ludo.supervisor",
                    program = %command.program,
                    timeout_ms = settings.start_timeout.as_millis() as u64,
                    "spawn not confirmed in time"
                );
                tokio::spawn(reap_late(task));
                Err(ProcessFailure::TimedOut)
            }
        };

        let (mut child, pid) = match spawned.and_then(|child| match child.id() {
            Some(pid) => Ok((child, pid)),
            None => Err(ProcessFailure::FailedToStart),
        }) {
            Ok(pair) => pair,
            Err(failure) => {
                let status = (failure == ProcessFailure::TimedOut).then_some(ProcessStatus::TimedOut);
                lock_info(&info).mark_ended(status);
                return Err(failure);
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        lock_info(&info).mark_running(pid);
        info!(target: "ludo.supervisor", pid, "process started");

        Ok(Spawned {
            supervisor: Supervisor {
                child,
                pid,
                settings,
                info,
                started: Instant::now(),
            },
            stdout,
            stderr,
        })
    }

    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }

    /// Run until the process is gone, serving at most one stop request.
    pub(crate) async fn supervise(mut self, mut requests: mpsc::Receiver<StopRequest>) -> Exit {
        let mut replies = Vec::new();
        let mut open = true;

        let (state, status) = loop {
            tokio::select! {
                waited = self.child.wait() => break self.exited(waited, false),
                req = requests.recv(), if open => match req {
                    Some(req) => {
                        replies.push(req.reply);
                        break self.stop().await;
                    }
                    None => open = false,
                },
            }
        };

        requests.close();
        while let Ok(req) = requests.try_recv() {
            replies.push(req.reply);
        }

        let elapsed = self.started.elapsed();
        lock_info(&self.info).mark_ended(status);
        match &state {
            RunnerState::Terminated { exit_code } => info!(
                target: "ludo.supervisor",
                pid = self.pid,
                exit_code,
                duration_ms = elapsed.as_millis() as u64,
                "process exited"
            ),
            other => warn!(
                target: "ludo.supervisor",
                pid = self.pid,
                state = %other,
                duration_ms = elapsed.as_millis() as u64,
                "process ended abnormally"
            ),
        }

        Exit { state, replies }
    }

    async fn stop(&mut self) -> (RunnerState, Option<ProcessStatus>) {
        lock_info(&self.info).phase = SupervisorState::Stopping;
        info!(target: "ludo.supervisor", pid = self.pid, "terminate requested");
        if let Err(e) = self.terminate() {
            warn!(target: "ludo.supervisor", pid = self.pid, error = %e, "terminate signal failed");
        }

        if let Ok(waited) = timeout(self.settings.kill_timeout, self.child.wait()).await {
            return self.exited(waited, true);
        }

        warn!(
            target: "ludo.supervisor",
            pid = self.pid,
            timeout_ms = self.settings.kill_timeout.as_millis() as u64,
            "stop ineffective: process ignored terminate, killing"
        );
        if let Err(e) = self.child.start_kill() {
            warn!(target: "ludo.supervisor", pid = self.pid, error = %e, "kill failed");
        }

        let waited = match self.settings.kill_confirm_timeout {
            Some(limit) => timeout(limit, self.child.wait()).await.ok(),
            None => Some(self.child.wait().await),
        };
        match waited {
            Some(waited) => {
                let (state, status) = self.exited(waited, true);
                let status = match status {
                    Some(ProcessStatus::Signaled { .. }) => Some(ProcessStatus::Killed),
                    other => other,
                };
                (state, status)
            }
            None => {
                error!(
                    target: "ludo.supervisor",
                    pid = self.pid,
                    "{} process still present after kill",
                    ProcessFailure::TimedOut.message()
                );
                (
                    RunnerState::Failed {
                        fault: ProcessFailure::TimedOut.into(),
                    },
                    Some(ProcessStatus::TimedOut),
                )
            }
        }
    }

    fn exited(
        &self,
        waited: io::Result<ExitStatus>,
        stopping: bool,
    ) -> (RunnerState, Option<ProcessStatus>) {
        match waited {
            Ok(status) => {
                let (state, status) = classify(status, stopping);
                (state, Some(status))
            }
            Err(e) => {
                warn!(target: "ludo.supervisor", pid = self.pid, error = %e, "wait on process failed");
                (
                    RunnerState::Failed {
                        fault: ProcessFailure::Unknown.into(),
                    },
                    None,
                )
            }
        }
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        // Already reaped: the pid may belong to someone else now.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        let pid = i32::try_from(pid).map_err(|_| io::Error::other("pid out of range"))?;
        kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}

async fn reap_late(task: JoinHandle<io::Result<Child>>) {
    if let Ok(Ok(mut child)) = task.await {
        warn!(target: "ludo.supervisor", pid = child.id(), "killing process that started after the start timeout");
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

/// Map an exit status to the runner's terminal state.
///
/// A signal death counts as a normal stop only while stopping.
pub(crate) fn classify(status: ExitStatus, stopping: bool) -> (RunnerState, ProcessStatus) {
    if let Some(code) = status.code() {
        return (
            RunnerState::Terminated { exit_code: code },
            ProcessStatus::Exited { code },
        );
    }
    match exit_signal(&status) {
        Some(signal) if stopping => (
            RunnerState::Terminated {
                exit_code: 128 + signal,
            },
            ProcessStatus::Signaled { signal },
        ),
        Some(signal) => (
            RunnerState::Failed {
                fault: ProcessFailure::Crashed.into(),
            },
            ProcessStatus::Signaled { signal },
        ),
        None => (
            RunnerState::Failed {
                fault: ProcessFailure::Unknown.into(),
            },
            ProcessStatus::Exited { code: -1 },
        ),
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn exit_codes_terminate_normally() {
        let (state, status) = classify(ExitStatus::from_raw(0), false);
        assert_eq!(state, RunnerState::Terminated { exit_code: 0 });
        assert_eq!(status, ProcessStatus::Exited { code: 0 });

        let (state, _) = classify(ExitStatus::from_raw(3 << 8), true);
        assert_eq!(state, RunnerState::Terminated { exit_code: 3 });
    }

    #[test]
    fn unrequested_signal_is_a_crash() {
        let (state, status) = classify(ExitStatus::from_raw(11), false);
        assert_eq!(
            state,
            RunnerState::Failed {
                fault: ProcessFailure::Crashed.into()
            }
        );
        assert_eq!(status, ProcessStatus::Signaled { signal: 11 });
    }

    #[test]
    fn requested_signal_is_a_stop() {
        let (state, _) = classify(ExitStatus::from_raw(15), true);
        assert_eq!(state, RunnerState::Terminated { exit_code: 143 });
    }

    #[test]
    fn settings_follow_config() {
        let config = LauncherConfig {
            kill_timeout_ms: 250,
            kill_confirm_timeout_ms: 0,
            ..LauncherConfig::default()
        };
        let settings = SupervisorSettings::from(&config);
        assert_eq!(settings.kill_timeout, Duration::from_millis(250));
        assert_eq!(settings.kill_confirm_timeout, None);
        assert_eq!(SupervisorSettings::default().kill_timeout, Duration::from_secs(5));
    }
}
