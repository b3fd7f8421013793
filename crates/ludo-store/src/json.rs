// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library persisted as a single JSON document.

use crate::{Game, LaunchParameters, LibraryStore, MemoryLibrary, StoreError};
use chrono::{DateTime, Utc};
use ludo_core::GameId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
struct LibraryDocument {
    #[serde(default)]
    games: Vec<Game>,
}

#[derive(Serialize)]
struct LibraryDocumentRef<'a> {
    games: &'a [Game],
}

/// A library stored in a JSON file and rewritten after every change.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// original.
#[derive(Debug)]
pub struct JsonLibrary {
    path: PathBuf,
    games: MemoryLibrary,
    write_lock: Mutex<()>,
}

impl JsonLibrary {
    /// Open the library at `path`; a missing file is an empty library.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let games = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let doc: LibraryDocument =
                    serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
                        path: path.display().to_string(),
                        source,
                    })?;
                debug!(target: "ludo.store", "loaded {} games from {}", doc.games.len(), path.display());
                MemoryLibrary::with_games(doc.games)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(target: "ludo.store", "no library at {}, starting empty", path.display());
                MemoryLibrary::new()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(Self {
            path,
            games,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a new game and persist.
    pub fn add_game(&self, game: Game) -> Result<(), StoreError> {
        self.mutate(|games| games.add_game(game))
    }

    /// Look up a game by id.
    pub fn get_game(&self, id: &GameId) -> Option<Game> {
        self.games.get_game(id)
    }

    /// Replace an existing game's record and persist.
    pub fn update_game(&self, id: &GameId, game: Game) -> Result<(), StoreError> {
        self.mutate(|games| games.update_game(id, game))
    }

    /// Remove a game and persist.
    pub fn delete_game(&self, id: &GameId) -> Result<Game, StoreError> {
        self.mutate(|games| games.delete_game(id))
    }

    /// All games ordered by id.
    pub fn all_games(&self) -> Vec<Game> {
        self.games.all_games()
    }

    /// Returns `true` if `id` is in the library.
    pub fn game_exists(&self, id: &GameId) -> bool {
        self.games.game_exists(id)
    }

    /// Set or clear the favourite flag and persist.
    pub fn set_favourite(&self, id: &GameId, favourite: bool) -> Result<(), StoreError> {
        self.mutate(|games| games.set_favourite(id, favourite))
    }

    /// Apply `f` to a copy of the library and keep the result only once it
    /// is on disk. A failed save leaves memory and file unchanged.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&MemoryLibrary) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let draft = MemoryLibrary::with_games(self.games.all_games());
        let out = f(&draft)?;
        let games = draft.all_games();
        self.save(&games)?;
        self.games.replace_all(games);
        Ok(out)
    }

    fn save(&self, games: &[Game]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let doc = LibraryDocumentRef { games };
        let json = serde_json::to_string_pretty(&doc).map_err(|source| StoreError::Malformed {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(target: "ludo.store", "saved {} games to {}", games.len(), self.path.display());
        Ok(())
    }
}

impl LibraryStore for JsonLibrary {
    fn launch_parameters(&self, id: &GameId) -> Result<LaunchParameters, StoreError> {
        self.games.launch_parameters(id)
    }

    fn record_last_played(&self, id: &GameId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.mutate(|games| games.record_last_played(id, at))?;
        info!(target: "ludo.store", "updated last played for game {id} to {}", at.to_rfc3339());
        Ok(())
    }
}
