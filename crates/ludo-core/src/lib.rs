// SPDX-License-Identifier: MIT OR Apache-2.0
//! ludo-core
//!
//! Shared value types for the Ludo launcher: game identity, launch
//! specifications, the runner lifecycle state machine and the failure
//! taxonomy reported by runners.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod event;
pub mod failure;
pub mod launch;
pub mod lifecycle;

pub use event::{OutputStream, RunnerEvent};
pub use failure::{ProcessFailure, RunnerFault};
pub use launch::{LaunchError, LaunchSpec, ResolvedCommand};
pub use lifecycle::{LifecycleError, LifecycleTransition, RunnerLifecycle, RunnerState};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque unique identifier of a game in the library.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

impl GameId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier: 32 random bits rendered in lowercase base 36.
    pub fn generate() -> Self {
        let mut num = (uuid::Uuid::new_v4().as_u128() & u128::from(u32::MAX)) as u32;
        if num == 0 {
            return Self("0".into());
        }
        let mut digits = Vec::new();
        while num > 0 {
            digits.push(ID_ALPHABET[(num % 36) as usize]);
            num /= 36;
        }
        digits.reverse();
        Self(digits.into_iter().map(char::from).collect())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_base36() {
        for _ in 0..64 {
            let id = GameId::generate();
            assert!(!id.as_str().is_empty());
            assert!(id.as_str().len() <= 7, "32 bits fit in 7 base-36 digits");
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
            );
        }
    }

    #[test]
    fn game_id_serializes_as_plain_string() {
        let id = GameId::new("abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc123""#);
    }
}
