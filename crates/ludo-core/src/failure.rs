// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure taxonomy surfaced through a runner's `Error` event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// OS-process-level failure observed by the supervisor.
///
/// None of these are retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessFailure {
    /// The process could not be spawned.
    FailedToStart,
    /// The process died from a signal without a stop request.
    Crashed,
    /// A bounded wait on the process elapsed.
    TimedOut,
    /// Writing to the process failed.
    WriteError,
    /// Reading from the process failed.
    ReadError,
    /// Anything else.
    Unknown,
}

impl ProcessFailure {
    /// Fixed human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            Self::FailedToStart => "Failed to start.",
            Self::Crashed => "Crashed.",
            Self::TimedOut => "Timed out.",
            Self::WriteError => "Write error.",
            Self::ReadError => "Read error.",
            Self::Unknown => "Unknown error.",
        }
    }

    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::FailedToStart => "FAILED_TO_START",
            Self::Crashed => "CRASHED",
            Self::TimedOut => "TIMED_OUT",
            Self::WriteError => "WRITE_ERROR",
            Self::ReadError => "READ_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Classify an I/O error raised while talking to the process.
    pub fn from_io(err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => Self::FailedToStart,
            ErrorKind::TimedOut => Self::TimedOut,
            ErrorKind::BrokenPipe | ErrorKind::WriteZero => Self::WriteError,
            ErrorKind::UnexpectedEof | ErrorKind::InvalidData => Self::ReadError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Why a runner ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunnerFault {
    /// The managed or detached process failed.
    Process {
        /// Which failure.
        failure: ProcessFailure,
    },
    /// A URL target did not use `http://` or `https://`.
    InvalidUrl {
        /// The rejected target.
        target: String,
    },
    /// The platform URL handler could not be invoked.
    OpenFailed {
        /// Raw underlying message.
        message: String,
    },
}

impl RunnerFault {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Process { failure } => failure.code(),
            Self::InvalidUrl { .. } => "INVALID_URL",
            Self::OpenFailed { .. } => "OPEN_FAILED",
        }
    }
}

impl From<ProcessFailure> for RunnerFault {
    fn from(failure: ProcessFailure) -> Self {
        Self::Process { failure }
    }
}

impl fmt::Display for RunnerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process { failure } => write!(f, "{failure}"),
            Self::InvalidUrl { target } => write!(f, "Invalid URL: {target}"),
            Self::OpenFailed { message } => f.write_str(message),
        }
    }
}

impl std::error::Error for RunnerFault {}
