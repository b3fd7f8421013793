// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event fan-out shared by every runner variant.

use ludo_core::{
    GameId, LifecycleError, OutputStream, RunnerEvent, RunnerLifecycle, RunnerState,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Capacity of each runner's broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Synchronous consumer of a runner's terminal event.
///
/// Called at most once per registration, on the task that ended the
/// runner, before broadcast subscribers see the event. Implementations
/// must not block.
pub trait RunnerObserver: Send + Sync {
    /// The runner emitted `Stopped` or `Error`.
    fn on_terminal(&self, game: &GameId, event: &RunnerEvent);
}

#[derive(Default)]
struct Observers {
    closed: bool,
    list: Vec<Arc<dyn RunnerObserver>>,
}

/// Lifecycle, state watch, observers and broadcast channel of one runner.
///
/// Terminal events go out in a fixed order: lifecycle transition, then
/// observers, then the state watch, then broadcast subscribers.
pub(crate) struct RunnerCore {
    name: &'static str,
    game: GameId,
    lifecycle: Mutex<RunnerLifecycle>,
    state_tx: watch::Sender<RunnerState>,
    events: broadcast::Sender<RunnerEvent>,
    observers: Mutex<Observers>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunnerCore {
    pub(crate) fn new(name: &'static str, game: GameId) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            name,
            game,
            lifecycle: Mutex::new(RunnerLifecycle::new()),
            state_tx: watch::Sender::new(RunnerState::Idle),
            events,
            observers: Mutex::new(Observers::default()),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn game(&self) -> &GameId {
        &self.game
    }

    pub(crate) fn state(&self) -> RunnerState {
        lock(&self.lifecycle).state().clone()
    }

    pub(crate) fn history(&self) -> Vec<ludo_core::LifecycleTransition> {
        lock(&self.lifecycle).history().to_vec()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.events.subscribe()
    }

    /// Register `observer`; `false` once the runner is terminal.
    pub(crate) fn observe(&self, observer: Arc<dyn RunnerObserver>) -> bool {
        let mut observers = lock(&self.observers);
        if observers.closed {
            return false;
        }
        observers.list.push(observer);
        true
    }

    /// Wait until the published state satisfies `settled`.
    pub(crate) async fn wait_for(&self, settled: impl FnMut(&RunnerState) -> bool) -> RunnerState {
        let mut rx = self.state_tx.subscribe();
        match rx.wait_for(settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Move to a non-terminal state.
    pub(crate) fn transition(
        &self,
        to: RunnerState,
        reason: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        lock(&self.lifecycle).transition(to.clone(), Some(reason.into()))?;
        debug!(target: "ludo.runner", game = %self.game, runner = self.name, state = %to, "state changed");
        self.state_tx.send_replace(to);
        Ok(())
    }

    /// `Starting → Running`, then `Started`.
    pub(crate) fn started(&self, reason: impl Into<String>) -> Result<(), LifecycleError> {
        self.transition(RunnerState::Running, reason)?;
        let _ = self.events.send(RunnerEvent::Started);
        Ok(())
    }

    /// Enter a terminal state and emit its event.
    ///
    /// Returns `false` (emitting nothing) when the runner is already
    /// terminal or `state` is not terminal.
    pub(crate) fn finish(&self, state: RunnerState, reason: impl Into<String>) -> bool {
        let event = match &state {
            RunnerState::Terminated { exit_code } => RunnerEvent::Stopped {
                exit_code: *exit_code,
            },
            RunnerState::Failed { fault } => RunnerEvent::Error {
                fault: fault.clone(),
            },
            _ => return false,
        };

        if lock(&self.lifecycle)
            .transition(state.clone(), Some(reason.into()))
            .is_err()
        {
            return false;
        }

        let observers = {
            let mut observers = lock(&self.observers);
            observers.closed = true;
            std::mem::take(&mut observers.list)
        };
        for observer in &observers {
            observer.on_terminal(&self.game, &event);
        }

        debug!(target: "ludo.runner", game = %self.game, runner = self.name, state = %state, "state changed");
        self.state_tx.send_replace(state);
        let _ = self.events.send(event);
        true
    }

    /// Forward one line of child output unless the runner already ended.
    pub(crate) fn output(&self, stream: OutputStream, line: String) {
        let observers = lock(&self.observers);
        if observers.closed {
            return;
        }
        let _ = self.events.send(RunnerEvent::Output { stream, line });
    }
}

impl std::fmt::Debug for RunnerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerCore")
            .field("name", &self.name)
            .field("game", &self.game)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
