// SPDX-License-Identifier: MIT OR Apache-2.0
//! The launcher context: store, registry and settings wired together.

use crate::detached::DetachedRunner;
use crate::managed::ManagedRunner;
use crate::registry::ProcessRegistry;
use crate::runner::Runner;
use crate::supervisor::SupervisorSettings;
use crate::url::{UrlOpener, UrlRunner};
use crate::HostError;
use chrono::Utc;
use ludo_config::{LastPlayedPolicy, LauncherConfig};
use ludo_core::{GameId, LaunchError};
use ludo_store::{LaunchParameters, LibraryStore, RunnerKind};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Static inputs to runner construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaunchSettings {
    /// Launch default-runner games detached (untracked, not stoppable).
    pub detached: bool,
    /// Supervisor timeouts for managed runners.
    pub supervisor: SupervisorSettings,
    /// When to record "last played".
    pub last_played: LastPlayedPolicy,
}

impl From<&LauncherConfig> for LaunchSettings {
    fn from(config: &LauncherConfig) -> Self {
        Self {
            detached: config.detached,
            supervisor: SupervisorSettings::from(config),
            last_played: config.last_played,
        }
    }
}

/// What [`Launcher::toggle`] did.
#[derive(Debug)]
pub enum Toggled {
    /// The game was running and a stop was issued.
    Stopped,
    /// The game was launched.
    Launched(Runner),
}

/// Plays and stops games from a library.
///
/// Construct once at startup and share by reference; it owns the single
/// [`ProcessRegistry`] of the application.
pub struct Launcher {
    settings: LaunchSettings,
    store: Arc<dyn LibraryStore>,
    opener: Arc<dyn UrlOpener>,
    registry: ProcessRegistry,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Create a launcher over `store`.
    pub fn new(
        settings: LaunchSettings,
        store: Arc<dyn LibraryStore>,
        opener: Arc<dyn UrlOpener>,
    ) -> Self {
        Self {
            settings,
            store,
            opener,
            registry: ProcessRegistry::new(),
        }
    }

    /// Settings runners are built with.
    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    /// The registry of tracked runners.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Build (but do not run) the runner for `game`.
    pub fn build_runner(
        &self,
        game: &GameId,
        params: &LaunchParameters,
    ) -> Result<Runner, HostError> {
        let runner = match params.runner_kind() {
            RunnerKind::WebLink => {
                UrlRunner::new(game.clone(), params.target.clone(), Arc::clone(&self.opener)).into()
            }
            RunnerKind::Default => {
                let command = params.to_spec().resolve()?;
                if self.settings.detached {
                    DetachedRunner::new(game.clone(), command).into()
                } else {
                    ManagedRunner::new(game.clone(), command, self.settings.supervisor).into()
                }
            }
        };
        Ok(runner)
    }

    /// Launch `game`: [`prepare`](Self::prepare) then [`launch`](Self::launch).
    pub async fn play(&self, game: &GameId) -> Result<Runner, HostError> {
        let runner = self.prepare(game)?;
        self.launch(&runner).await?;
        Ok(runner)
    }

    /// Build the runner for `game` without running it.
    ///
    /// A managed runner is returned only once it is tracked by the
    /// registry; detached and URL runners are never tracked. Fails with
    /// [`HostError::AlreadyRunning`] while the game has a live tracked
    /// runner, including one that is prepared but not yet launched.
    ///
    /// Under [`LastPlayedPolicy::OnLaunch`] the timestamp is written here,
    /// before the command is resolved, so a launch that then fails still
    /// counts.
    pub fn prepare(&self, game: &GameId) -> Result<Runner, HostError> {
        let params = self.store.launch_parameters(game)?;
        if !params.to_spec().is_launchable() {
            warn!(target: "ludo.launcher", game = %game, "nothing to launch");
            return Err(LaunchError::InvalidSpec {
                reason: "no valid command provided to run the game".into(),
            }
            .into());
        }
        if self.registry.get_runner(game).is_some() {
            return Err(HostError::AlreadyRunning(game.clone()));
        }

        if self.settings.last_played == LastPlayedPolicy::OnLaunch {
            self.record_last_played(game);
        }

        let runner = self.build_runner(game, &params)?;
        if !self.registry.add_process(&runner) && runner.can_stop() {
            // Another prepare for the same game registered first.
            return Err(HostError::AlreadyRunning(game.clone()));
        }
        Ok(runner)
    }

    /// Run a prepared runner.
    pub async fn launch(&self, runner: &Runner) -> Result<(), HostError> {
        info!(target: "ludo.launcher", game = %runner.game(), runner = runner.name(), "playing");
        runner.run().await?;
        if self.settings.last_played == LastPlayedPolicy::OnStart {
            self.record_last_played(runner.game());
        }
        Ok(())
    }

    /// Stop `game` if it is tracked and running.
    pub async fn stop(&self, game: &GameId) -> bool {
        self.registry.stop_game(game).await
    }

    /// Whether `game` has a tracked, running process.
    pub fn is_running(&self, game: &GameId) -> bool {
        self.registry.is_running(game)
    }

    /// Stop `game` when running, play it otherwise.
    pub async fn toggle(&self, game: &GameId) -> Result<Toggled, HostError> {
        if self.is_running(game) {
            self.stop(game).await;
            Ok(Toggled::Stopped)
        } else {
            self.play(game).await.map(Toggled::Launched)
        }
    }

    /// Games with a tracked runner.
    pub fn tracked_games(&self) -> Vec<GameId> {
        self.registry.tracked()
    }

    /// Stop every tracked runner concurrently; returns how many stopped.
    pub async fn stop_all(&self) -> usize {
        let mut stops = JoinSet::new();
        for game in self.registry.tracked() {
            if let Some(runner) = self.registry.get_runner(&game) {
                stops.spawn(async move { runner.stop().await });
            }
        }
        let mut stopped = 0;
        while let Some(result) = stops.join_next().await {
            if matches!(result, Ok(true)) {
                stopped += 1;
            }
        }
        stopped
    }

    fn record_last_played(&self, game: &GameId) {
        if let Err(e) = self.store.record_last_played(game, Utc::now()) {
            warn!(target: "ludo.launcher", game = %game, error = %e, "could not record last played");
        }
    }
}
