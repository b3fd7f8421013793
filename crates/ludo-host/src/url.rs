// SPDX-License-Identifier: MIT OR Apache-2.0
//! Web link runner: hands a URL to the platform's default handler.

use crate::RunnerError;
use crate::events::RunnerCore;
use ludo_core::{GameId, RunnerFault, RunnerState};
use std::sync::Arc;
use tracing::{info, warn};

/// Something that can open a URL.
pub trait UrlOpener: Send + Sync {
    /// Open `url`, returning once the handler was invoked.
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs with the desktop's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Returns `true` for `http://` and `https://` URLs, any case.
pub fn is_web_url(target: &str) -> bool {
    let lower = target.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Runner that opens a web link.
pub struct UrlRunner {
    pub(crate) core: RunnerCore,
    target: String,
    opener: Arc<dyn UrlOpener>,
}

impl std::fmt::Debug for UrlRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlRunner")
            .field("core", &self.core)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl UrlRunner {
    /// Label of this launch strategy.
    pub const NAME: &'static str = "Web Link Runner";

    /// Create an idle runner for `target`.
    pub fn new(game: GameId, target: impl Into<String>, opener: Arc<dyn UrlOpener>) -> Self {
        Self {
            core: RunnerCore::new(Self::NAME, game),
            target: target.into().trim().to_string(),
            opener,
        }
    }

    /// The (trimmed) URL.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Validate and open the URL.
    pub async fn run(&self) -> Result<(), RunnerError> {
        self.core
            .transition(RunnerState::Starting, "run requested")
            .map_err(RunnerError::InvalidState)?;

        if !is_web_url(&self.target) {
            warn!(target: "ludo.runner", game = %self.core.game(), url = %self.target, "rejected non-web URL");
            return Err(self.fail(RunnerFault::InvalidUrl {
                target: self.target.clone(),
            }));
        }

        let opener = Arc::clone(&self.opener);
        let url = self.target.clone();
        let opened = tokio::task::spawn_blocking(move || opener.open(&url))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));

        match opened {
            Ok(()) => {
                info!(target: "ludo.runner", game = %self.core.game(), url = %self.target, "opened web link");
                self.core
                    .started("handler invoked")
                    .map_err(RunnerError::InvalidState)
            }
            Err(message) => {
                warn!(target: "ludo.runner", game = %self.core.game(), url = %self.target, error = %message, "could not open web link");
                Err(self.fail(RunnerFault::OpenFailed { message }))
            }
        }
    }

    fn fail(&self, fault: RunnerFault) -> RunnerError {
        self.core.finish(
            RunnerState::Failed {
                fault: fault.clone(),
            },
            fault.to_string(),
        );
        RunnerError::Fault(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_check_ignores_case_and_padding() {
        assert!(is_web_url("https://example.com"));
        assert!(is_web_url("HTTP://EXAMPLE.COM"));
        assert!(is_web_url("  https://example.com/play  "));
        assert!(!is_web_url("ftp://example.com"));
        assert!(!is_web_url("steam://run/440"));
        assert!(!is_web_url("example.com"));
    }
}
