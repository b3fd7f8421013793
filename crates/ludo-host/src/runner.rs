// SPDX-License-Identifier: MIT OR Apache-2.0
//! The closed set of launch strategies.

use crate::RunnerError;
use crate::detached::DetachedRunner;
use crate::events::{RunnerCore, RunnerObserver};
use crate::managed::ManagedRunner;
use crate::url::UrlRunner;
use ludo_core::{GameId, LifecycleTransition, RunnerEvent, RunnerState};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// A way to start a game.
///
/// Cheap to clone; clones share the same underlying runner. Only
/// [`Runner::Managed`] can be stopped.
#[derive(Debug, Clone)]
pub enum Runner {
    /// Supervised child process.
    Managed(Arc<ManagedRunner>),
    /// Untracked child process.
    Detached(Arc<DetachedRunner>),
    /// Web link.
    Url(Arc<UrlRunner>),
}

impl Runner {
    fn core(&self) -> &RunnerCore {
        match self {
            Runner::Managed(r) => r.core.as_ref(),
            Runner::Detached(r) => &r.core,
            Runner::Url(r) => &r.core,
        }
    }

    /// Human-readable label of the launch strategy.
    pub fn name(&self) -> &'static str {
        self.core().name()
    }

    /// Game this runner launches.
    pub fn game(&self) -> &GameId {
        self.core().game()
    }

    /// Whether [`stop`](Self::stop) can ever do anything.
    pub fn can_stop(&self) -> bool {
        matches!(self, Runner::Managed(_))
    }

    /// Start the launch. Returns once the start succeeded or failed;
    /// later lifecycle changes arrive as events.
    pub async fn run(&self) -> Result<(), RunnerError> {
        match self {
            Runner::Managed(r) => r.run().await,
            Runner::Detached(r) => r.run().await,
            Runner::Url(r) => r.run().await,
        }
    }

    /// Stop a running managed process. `false` if nothing was stopped.
    pub async fn stop(&self) -> bool {
        match self {
            Runner::Managed(r) => r.stop().await,
            Runner::Detached(_) | Runner::Url(_) => false,
        }
    }

    /// Always `false` for runners that cannot be stopped.
    pub fn is_running(&self) -> bool {
        match self {
            Runner::Managed(r) => r.is_running(),
            Runner::Detached(_) | Runner::Url(_) => false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.core().state()
    }

    /// Every state change so far.
    pub fn history(&self) -> Vec<LifecycleTransition> {
        self.core().history()
    }

    /// Receive events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.core().subscribe()
    }

    /// [`subscribe`](Self::subscribe) as a `Stream`.
    pub fn event_stream(&self) -> BroadcastStream<RunnerEvent> {
        BroadcastStream::new(self.subscribe())
    }

    /// Register a terminal-event observer; `false` if already ended.
    pub fn observe(&self, observer: Arc<dyn RunnerObserver>) -> bool {
        self.core().observe(observer)
    }

    /// Resolve once the runner has settled: terminal for a managed
    /// runner, `Running` or `Failed` for the others.
    pub async fn wait(&self) -> RunnerState {
        match self {
            Runner::Managed(r) => r.wait().await,
            Runner::Detached(_) | Runner::Url(_) => {
                self.core()
                    .wait_for(|s| matches!(s, RunnerState::Running) || s.is_terminal())
                    .await
            }
        }
    }

    /// Same underlying runner?
    pub fn ptr_eq(&self, other: &Runner) -> bool {
        match (self, other) {
            (Runner::Managed(a), Runner::Managed(b)) => Arc::ptr_eq(a, b),
            (Runner::Detached(a), Runner::Detached(b)) => Arc::ptr_eq(a, b),
            (Runner::Url(a), Runner::Url(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<ManagedRunner> for Runner {
    fn from(r: ManagedRunner) -> Self {
        Runner::Managed(Arc::new(r))
    }
}

impl From<DetachedRunner> for Runner {
    fn from(r: DetachedRunner) -> Self {
        Runner::Detached(Arc::new(r))
    }
}

impl From<UrlRunner> for Runner {
    fn from(r: UrlRunner) -> Self {
        Runner::Url(Arc::new(r))
    }
}
