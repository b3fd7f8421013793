// SPDX-License-Identifier: MIT OR Apache-2.0
//! ludo-store
//!
//! The game library as seen by the launcher: [`Game`] records, the
//! [`LibraryStore`] trait the runner layer consumes, and two stores
//! implementing it: [`MemoryLibrary`] and the file-backed [`JsonLibrary`].
#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use ludo_core::{GameId, LaunchSpec};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod json;
pub mod memory;

pub use json::JsonLibrary;
pub use memory::MemoryLibrary;

/// Errors from library store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No game with this id exists.
    #[error("game not found: {0}")]
    NotFound(GameId),

    /// A game with this id already exists.
    #[error("game already exists: {0}")]
    Duplicate(GameId),

    /// Reading or writing the backing file failed.
    #[error("library i/o error at {path}: {source}")]
    Io {
        /// File being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a valid library document.
    #[error("library file {path} is malformed: {source}")]
    Malformed {
        /// File being parsed.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "GAME_NOT_FOUND",
            Self::Duplicate(_) => "GAME_EXISTS",
            Self::Io { .. } | Self::Malformed { .. } => "STORE",
        }
    }
}

/// Which runner a game should be launched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// Spawn the executable (managed or detached per configuration).
    Default,
    /// Open the target in the platform's URL handler.
    WebLink,
}

/// A game in the library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Game {
    /// Unique identifier.
    pub id: GameId,
    /// Display name.
    pub title: String,
    /// Alternate title used for sorting.
    pub sort_title: String,
    /// Marked as a favourite.
    pub favourite: bool,
    /// User rating, 0.0 to 5.0.
    pub star_rating: f32,
    /// Developer name.
    pub developer: String,
    /// Publisher name.
    pub publisher: String,
    /// Release year, 0 when unknown.
    pub year: u32,
    /// Short summary.
    pub description: String,
    /// Executable path or URL.
    pub executable_path: String,
    /// Working directory override (may be empty).
    pub working_directory: String,
    /// Raw shell-style launch options.
    pub launch_options: String,
    /// Folder for browsing the game's files.
    pub browse_directory: String,
    /// When the game was last launched.
    pub last_played: Option<DateTime<Utc>>,
    /// Number of sessions played.
    pub sessions_played: u32,
    /// Total playtime in minutes.
    pub playtime: f64,
    /// Explicit runner choice; detected from the target when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerKind>,
}

impl Game {
    /// A game with a fresh id and the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: GameId::generate(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// The fields the launcher needs.
    pub fn launch_parameters(&self) -> LaunchParameters {
        LaunchParameters {
            target: self.executable_path.clone(),
            working_directory: self.working_directory.clone(),
            launch_options: self.launch_options.clone(),
            runner: self.runner,
        }
    }
}

/// Launch-related fields of a [`Game`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParameters {
    /// Executable path or URL (may be empty).
    pub target: String,
    /// Working directory (may be empty).
    pub working_directory: String,
    /// Raw launch options (may be empty).
    pub launch_options: String,
    /// Explicit runner choice.
    pub runner: Option<RunnerKind>,
}

impl LaunchParameters {
    /// Build the [`LaunchSpec`] these parameters describe.
    pub fn to_spec(&self) -> LaunchSpec {
        LaunchSpec::from_parts(&self.target, &self.launch_options, &self.working_directory)
    }

    /// The runner to use: the explicit choice, else a web link when the
    /// target looks like a URL.
    pub fn runner_kind(&self) -> RunnerKind {
        match self.runner {
            Some(kind) => kind,
            None if self.target.trim().contains("://") => RunnerKind::WebLink,
            None => RunnerKind::Default,
        }
    }
}

/// Durable record of games, as consumed by the launcher.
pub trait LibraryStore: Send + Sync {
    /// Launch parameters for `id`.
    fn launch_parameters(&self, id: &GameId) -> Result<LaunchParameters, StoreError>;

    /// Record that `id` was played at `at`.
    fn record_last_played(&self, id: &GameId, at: DateTime<Utc>) -> Result<(), StoreError>;
}
