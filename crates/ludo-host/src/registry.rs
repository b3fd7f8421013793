// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process registry: the running, stoppable runner of each game.

use crate::events::RunnerObserver;
use crate::managed::ManagedRunner;
use crate::runner::Runner;
use ludo_core::{GameId, RunnerEvent};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

type Entries = Mutex<BTreeMap<GameId, Weak<ManagedRunner>>>;

/// At most one tracked runner per game.
///
/// Clones share the same table. Entries hold weak references and remove
/// themselves when their runner emits `Stopped` or `Error`, so a game in
/// the registry always maps to a live, non-terminal runner.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    entries: Arc<Entries>,
}

fn lock(entries: &Entries) -> MutexGuard<'_, BTreeMap<GameId, Weak<ManagedRunner>>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drops a registry entry once its runner ends.
struct RemoveOnTerminal {
    entries: Weak<Entries>,
    runner: Weak<ManagedRunner>,
}

impl RunnerObserver for RemoveOnTerminal {
    fn on_terminal(&self, game: &GameId, event: &RunnerEvent) {
        let Some(entries) = self.entries.upgrade() else {
            return;
        };
        let mut entries = lock(&entries);
        if entries.get(game).is_some_and(|w| w.ptr_eq(&self.runner)) {
            entries.remove(game);
            debug!(target: "ludo.registry", game = %game, ?event, "untracked finished runner");
        }
    }
}

impl ProcessRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `runner` under its game.
    ///
    /// No-op (returning `false`) for runners that cannot be stopped, when
    /// the game already has a live entry, or when `runner` already ended.
    pub fn add_process(&self, runner: &Runner) -> bool {
        let Runner::Managed(managed) = runner else {
            debug!(target: "ludo.registry", game = %runner.game(), runner = runner.name(), "not tracking unstoppable runner");
            return false;
        };
        let game = runner.game().clone();

        let mut entries = lock(&self.entries);
        if let Some(existing) = entries.get(&game).and_then(Weak::upgrade) {
            if !existing.core.state().is_terminal() {
                debug!(target: "ludo.registry", game = %game, "already tracked");
                return false;
            }
        }

        let weak = Arc::downgrade(managed);
        let hook = RemoveOnTerminal {
            entries: Arc::downgrade(&self.entries),
            runner: weak.clone(),
        };
        if !runner.observe(Arc::new(hook)) {
            entries.remove(&game);
            return false;
        }
        entries.insert(game.clone(), weak);
        debug!(target: "ludo.registry", game = %game, "tracking runner");
        true
    }

    /// Forget `game`. Idempotent.
    pub fn remove_process(&self, game: &GameId) {
        if lock(&self.entries).remove(game).is_some() {
            debug!(target: "ludo.registry", game = %game, "untracked");
        }
    }

    /// The tracked runner of `game`, if any.
    pub fn get_runner(&self, game: &GameId) -> Option<Runner> {
        let mut entries = lock(&self.entries);
        let live = entries
            .get(game)
            .and_then(Weak::upgrade)
            .filter(|r| !r.core.state().is_terminal());
        match live {
            Some(runner) => Some(Runner::Managed(runner)),
            None => {
                entries.remove(game);
                None
            }
        }
    }

    /// `false` if untracked, otherwise whether the runner's process is alive.
    pub fn is_running(&self, game: &GameId) -> bool {
        self.get_runner(game).is_some_and(|r| r.is_running())
    }

    /// Stop the tracked runner of `game`. `false` if there was nothing to stop.
    pub async fn stop_game(&self, game: &GameId) -> bool {
        match self.get_runner(game) {
            Some(runner) => runner.stop().await,
            None => false,
        }
    }

    /// Games with a live entry, in id order.
    pub fn tracked(&self) -> Vec<GameId> {
        let mut entries = lock(&self.entries);
        entries.retain(|_, w| w.upgrade().is_some_and(|r| !r.core.state().is_terminal()));
        entries.keys().cloned().collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.tracked().len()
    }

    /// `true` when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
