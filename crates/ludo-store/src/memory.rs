// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory library, used by tests and as the working set of [`JsonLibrary`](crate::JsonLibrary).

use crate::{Game, LaunchParameters, LibraryStore, StoreError};
use chrono::{DateTime, Utc};
use ludo_core::GameId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A library held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    games: Mutex<BTreeMap<GameId, Game>>,
}

impl MemoryLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a library pre-populated with `games`.
    pub fn with_games(games: impl IntoIterator<Item = Game>) -> Self {
        Self {
            games: Mutex::new(games.into_iter().map(|g| (g.id.clone(), g)).collect()),
        }
    }

    fn games(&self) -> MutexGuard<'_, BTreeMap<GameId, Game>> {
        self.games.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a new game; fails if the id is taken.
    pub fn add_game(&self, game: Game) -> Result<(), StoreError> {
        let mut games = self.games();
        if games.contains_key(&game.id) {
            return Err(StoreError::Duplicate(game.id));
        }
        games.insert(game.id.clone(), game);
        Ok(())
    }

    /// Look up a game by id.
    pub fn get_game(&self, id: &GameId) -> Option<Game> {
        self.games().get(id).cloned()
    }

    /// Replace an existing game's record.
    pub fn update_game(&self, id: &GameId, mut game: Game) -> Result<(), StoreError> {
        let mut games = self.games();
        let slot = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        game.id = id.clone();
        *slot = game;
        Ok(())
    }

    /// Remove a game, returning its record.
    pub fn delete_game(&self, id: &GameId) -> Result<Game, StoreError> {
        self.games()
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// All games ordered by id.
    pub fn all_games(&self) -> Vec<Game> {
        self.games().values().cloned().collect()
    }

    /// Returns `true` if `id` is in the library.
    pub fn game_exists(&self, id: &GameId) -> bool {
        self.games().contains_key(id)
    }

    /// Set or clear the favourite flag.
    pub fn set_favourite(&self, id: &GameId, favourite: bool) -> Result<(), StoreError> {
        self.modify(id, |g| g.favourite = favourite)
    }

    pub(crate) fn replace_all(&self, games: Vec<Game>) {
        *self.games() = games.into_iter().map(|g| (g.id.clone(), g)).collect();
    }

    pub(crate) fn modify(&self, id: &GameId, f: impl FnOnce(&mut Game)) -> Result<(), StoreError> {
        let mut games = self.games();
        let game = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        f(game);
        Ok(())
    }
}

impl LibraryStore for MemoryLibrary {
    fn launch_parameters(&self, id: &GameId) -> Result<LaunchParameters, StoreError> {
        self.games()
            .get(id)
            .map(Game::launch_parameters)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn record_last_played(&self, id: &GameId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.modify(id, |g| g.last_played = Some(at))
    }
}
