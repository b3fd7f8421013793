// SPDX-License-Identifier: MIT OR Apache-2.0
//! Launch specifications: turning user-entered strings into a command line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building a command from a [`LaunchSpec`].
///
/// Both are reported before any OS interaction is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// Nothing launchable: empty target and arguments, or arguments that
    /// cannot be split into shell words.
    #[error("invalid launch spec: {reason}")]
    InvalidSpec {
        /// What made the spec unusable.
        reason: String,
    },

    /// No working directory was given and none could be derived from the target.
    #[error("no working directory could be determined for {program}")]
    NoWorkingDirectory {
        /// Executable the directory was being resolved for.
        program: String,
    },
}

impl LaunchError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSpec { .. } => "INVALID_SPEC",
            Self::NoWorkingDirectory { .. } => "NO_WORKING_DIRECTORY",
        }
    }
}

/// What to execute for a game: target, raw shell-style arguments and an
/// optional working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Executable path or URL.
    pub target: Option<String>,
    /// Raw launch options, tokenized with POSIX shell word-splitting.
    #[serde(default)]
    pub arguments: String,
    /// Explicit working directory; wins over the derived one.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
}

impl LaunchSpec {
    /// Spec that runs `target` with no arguments.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Build a spec from raw store fields, treating empty strings as absent.
    pub fn from_parts(target: &str, arguments: &str, working_directory: &str) -> Self {
        Self {
            target: (!target.is_empty()).then(|| target.to_string()),
            arguments: arguments.to_string(),
            working_directory: (!working_directory.is_empty())
                .then(|| PathBuf::from(working_directory)),
        }
    }

    /// Set the raw argument string.
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    /// Set an explicit working directory.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Non-empty target (empty strings count as absent).
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns `true` when either a target or arguments are present.
    pub fn is_launchable(&self) -> bool {
        self.target().is_some() || !self.arguments.is_empty()
    }

    /// Tokenize into the full command line, executable first.
    ///
    /// With a target the command is `[target] + split(arguments)`; without
    /// one the arguments alone form the command.
    pub fn command(&self) -> Result<Vec<String>, LaunchError> {
        let mut command = Vec::new();
        if let Some(target) = self.target() {
            command.push(target.to_string());
        }
        if !self.arguments.is_empty() {
            let words =
                shell_words::split(&self.arguments).map_err(|e| LaunchError::InvalidSpec {
                    reason: format!("cannot split launch options: {e}"),
                })?;
            command.extend(words);
        }
        if command.is_empty() {
            return Err(LaunchError::InvalidSpec {
                reason: "no valid command provided to run the game".into(),
            });
        }
        Ok(command)
    }

    /// Tokenize and resolve the working directory.
    pub fn resolve(&self) -> Result<ResolvedCommand, LaunchError> {
        let mut command = self.command()?.into_iter();
        let Some(program) = command.next() else {
            return Err(LaunchError::InvalidSpec {
                reason: "no valid command provided to run the game".into(),
            });
        };
        let args: Vec<String> = command.collect();

        let working_dir = match self
            .working_directory
            .as_ref()
            .filter(|d| !d.as_os_str().is_empty())
        {
            Some(dir) => dir.clone(),
            None => derived_working_dir(&program).ok_or_else(|| {
                LaunchError::NoWorkingDirectory {
                    program: program.clone(),
                }
            })?,
        };

        Ok(ResolvedCommand {
            program,
            args,
            working_dir,
        })
    }
}

/// Parent directory of `program` when it names an existing regular file.
fn derived_working_dir(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if !path.is_file() {
        return None;
    }
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// A tokenized command with its resolved working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCommand {
    /// Executable to spawn.
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Directory the process starts in.
    pub working_dir: PathBuf,
}

impl ResolvedCommand {
    /// The full command line, executable first.
    pub fn tokens(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_words::join(self.tokens()))
    }
}
