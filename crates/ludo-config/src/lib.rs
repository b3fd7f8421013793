// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading and validation for the Ludo launcher.
//!
//! [`LauncherConfig`] holds the static inputs handed to runners and the
//! process supervisor at construction time (detached mode, timeouts), plus
//! the front-end's logging and library settings. It is read once at
//! startup and passed down explicitly.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file (or an override value) could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

impl ConfigError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "CONFIG_NOT_FOUND",
            Self::ParseError { .. } => "CONFIG_PARSE",
            Self::ValidationError { .. } => "CONFIG_INVALID",
        }
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The graceful-exit wait is unusually long.
    LargeKillTimeout {
        /// Configured value in milliseconds.
        millis: u64,
    },
    /// The wait after a force kill has no bound.
    UnboundedKillConfirm,
    /// Detached mode: launched games cannot be tracked or stopped.
    DetachedMode,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::LargeKillTimeout { millis } => {
                write!(f, "kill_timeout_ms is large ({millis}ms); stop requests may block for long")
            }
            ConfigWarning::UnboundedKillConfirm => {
                f.write_str("kill_confirm_timeout_ms is 0; a wedged process can hang a stop forever")
            }
            ConfigWarning::DetachedMode => {
                f.write_str("detached mode is on; launched games cannot be stopped")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// When a game's "last played" timestamp is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LastPlayedPolicy {
    /// When the launch is requested, even if it then fails.
    #[default]
    OnLaunch,
    /// Only once the runner reports a successful start.
    OnStart,
}

/// Top-level launcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct LauncherConfig {
    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// JSON library file used by the command-line front-end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<String>,

    /// Launch games fully detached (untracked, not stoppable).
    pub detached: bool,

    /// Wait for graceful exit after terminate before force killing.
    pub kill_timeout_ms: u64,

    /// Bound on waiting for the OS to confirm a spawn.
    pub start_timeout_ms: u64,

    /// Bound on waiting for exit after a force kill; `0` waits forever.
    pub kill_confirm_timeout_ms: u64,

    /// When to record "last played".
    pub last_played: LastPlayedPolicy,
}

/// Default graceful-exit wait.
pub const DEFAULT_KILL_TIMEOUT_MS: u64 = 5_000;

/// Default spawn confirmation bound.
pub const DEFAULT_START_TIMEOUT_MS: u64 = 30_000;

/// Default post-kill wait.
pub const DEFAULT_KILL_CONFIRM_TIMEOUT_MS: u64 = 10_000;

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".into()),
            library_path: None,
            detached: false,
            kill_timeout_ms: DEFAULT_KILL_TIMEOUT_MS,
            start_timeout_ms: DEFAULT_START_TIMEOUT_MS,
            kill_confirm_timeout_ms: DEFAULT_KILL_CONFIRM_TIMEOUT_MS,
            last_played: LastPlayedPolicy::OnLaunch,
        }
    }
}

impl LauncherConfig {
    /// Graceful-exit wait as a [`Duration`].
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// Spawn confirmation bound as a [`Duration`].
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Post-kill wait, `None` when unbounded.
    pub fn kill_confirm_timeout(&self) -> Option<Duration> {
        (self.kill_confirm_timeout_ms > 0).then(|| Duration::from_millis(self.kill_confirm_timeout_ms))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Threshold above which a kill timeout generates a warning.
const LARGE_KILL_TIMEOUT_MS: u64 = 60_000;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`LauncherConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`LauncherConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<LauncherConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => LauncherConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Parse a TOML string into a [`LauncherConfig`].
pub fn parse_toml(content: &str) -> Result<LauncherConfig, ConfigError> {
    toml::from_str::<LauncherConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply overrides from the process environment.
///
/// Recognised variables:
/// - `LUDO_LOG_LEVEL`
/// - `LUDO_LIBRARY`
/// - `LUDO_DETACHED` (`1`, `true`, `yes` enable; `0`, `false`, `no` disable)
/// - `LUDO_KILL_TIMEOUT_MS`
pub fn apply_env_overrides(config: &mut LauncherConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_from(
    config: &mut LauncherConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(val) = lookup("LUDO_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Some(val) = lookup("LUDO_LIBRARY") {
        config.library_path = Some(val);
    }
    if let Some(val) = lookup("LUDO_DETACHED") {
        config.detached = match val.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            other => {
                return Err(ConfigError::ParseError {
                    reason: format!("LUDO_DETACHED: expected a boolean, got '{other}'"),
                });
            }
        };
    }
    if let Some(val) = lookup("LUDO_KILL_TIMEOUT_MS") {
        config.kill_timeout_ms = val.trim().parse().map_err(|_| ConfigError::ParseError {
            reason: format!("LUDO_KILL_TIMEOUT_MS: expected milliseconds, got '{val}'"),
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (unknown log level, zero timeouts) are returned as a
/// [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &LauncherConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    if config.kill_timeout_ms == 0 {
        errors.push("kill_timeout_ms must be greater than zero".into());
    } else if config.kill_timeout_ms > LARGE_KILL_TIMEOUT_MS {
        warnings.push(ConfigWarning::LargeKillTimeout {
            millis: config.kill_timeout_ms,
        });
    }

    if config.start_timeout_ms == 0 {
        errors.push("start_timeout_ms must be greater than zero".into());
    }

    if config.kill_confirm_timeout_ms == 0 {
        warnings.push(ConfigWarning::UnboundedKillConfirm);
    }

    if config.detached {
        warnings.push(ConfigWarning::DetachedMode);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}
