// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end launch scenarios across config, store and host.

use ludo_config::{LauncherConfig, parse_toml};
use ludo_core::{GameId, ProcessFailure, RunnerEvent, RunnerFault, RunnerState};
use ludo_host::{HostError, LaunchSettings, Launcher, UrlOpener};
use ludo_store::{Game, JsonLibrary, LibraryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_stream::StreamExt;

const LIMIT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct CountingOpener(AtomicUsize);

impl UrlOpener for CountingOpener {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn add(lib: &JsonLibrary, id: &str, target: &str, options: &str) -> GameId {
    let game = Game {
        id: GameId::new(id),
        title: id.to_string(),
        executable_path: target.into(),
        launch_options: options.into(),
        ..Game::default()
    };
    lib.add_game(game).unwrap();
    GameId::new(id)
}

fn launcher(config: &LauncherConfig, lib: Arc<JsonLibrary>, opener: Arc<CountingOpener>) -> Launcher {
    Launcher::new(LaunchSettings::from(config), lib, opener)
}

#[cfg(unix)]
#[tokio::test]
async fn true_runs_to_completion_and_is_untracked() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = Arc::new(JsonLibrary::open(tmp.path().join("library.json")).unwrap());
    let id = add(&lib, "t", "/bin/true", "");
    let launcher = launcher(&LauncherConfig::default(), lib.clone(), Arc::default());

    let runner = launcher.prepare(&id).unwrap();
    let events = runner.event_stream();
    launcher.launch(&runner).await.unwrap();

    let lifecycle: Vec<RunnerEvent> = timeout(
        LIMIT,
        events
            .filter_map(|e| e.ok())
            .filter(|e| !matches!(e, RunnerEvent::Output { .. }))
            .take(2)
            .collect(),
    )
    .await
    .unwrap();
    assert_eq!(
        lifecycle,
        vec![RunnerEvent::Started, RunnerEvent::Stopped { exit_code: 0 }]
    );
    assert!(launcher.registry().get_runner(&id).is_none());

    let reopened = JsonLibrary::open(lib.path()).unwrap();
    assert!(reopened.get_game(&id).unwrap().last_played.is_some());
}

#[tokio::test]
async fn empty_game_never_reaches_a_runner() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = Arc::new(JsonLibrary::open(tmp.path().join("library.json")).unwrap());
    let id = add(&lib, "empty", "", "");
    let opener = Arc::new(CountingOpener::default());
    let launcher = launcher(&LauncherConfig::default(), lib.clone(), opener.clone());

    let err = launcher.play(&id).await.unwrap_err();
    assert!(matches!(err, HostError::Launch(_)));
    assert_eq!(err.code(), "INVALID_SPEC");
    assert!(launcher.tracked_games().is_empty());
    assert_eq!(opener.0.load(Ordering::SeqCst), 0);
    assert!(lib.launch_parameters(&id).unwrap().target.is_empty());
}

#[tokio::test]
async fn ftp_link_fails_without_invoking_a_handler() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = Arc::new(JsonLibrary::open(tmp.path().join("library.json")).unwrap());
    let id = add(&lib, "ftp", "ftp://example.com", "");
    let opener = Arc::new(CountingOpener::default());
    let launcher = launcher(&LauncherConfig::default(), lib, opener.clone());

    let runner = launcher.prepare(&id).unwrap();
    let mut rx = runner.subscribe();
    let err = launcher.launch(&runner).await.unwrap_err();

    assert_eq!(err.code(), "INVALID_URL");
    assert_eq!(
        rx.recv().await.unwrap(),
        RunnerEvent::Error {
            fault: RunnerFault::InvalidUrl {
                target: "ftp://example.com".into()
            }
        }
    );
    assert_eq!(opener.0.load(Ordering::SeqCst), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn configured_kill_timeout_bounds_a_stubborn_stop() {
    let config = parse_toml("kill_timeout_ms = 200\nkill_confirm_timeout_ms = 5000").unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let lib = Arc::new(JsonLibrary::open(tmp.path().join("library.json")).unwrap());
    let id = add(
        &lib,
        "stubborn",
        "/bin/sh",
        "-c 'trap \"\" TERM; echo ready; exec sleep 30'",
    );
    let launcher = launcher(&config, lib, Arc::default());

    let runner = launcher.prepare(&id).unwrap();
    let mut rx = runner.subscribe();
    launcher.launch(&runner).await.unwrap();
    timeout(LIMIT, async {
        while let Ok(event) = rx.recv().await {
            if matches!(&event, RunnerEvent::Output { line, .. } if line == "ready") {
                break;
            }
        }
    })
    .await
    .unwrap();

    assert!(timeout(LIMIT, launcher.stop(&id)).await.unwrap());
    assert_eq!(runner.state(), RunnerState::Terminated { exit_code: 137 });
    assert!(!launcher.is_running(&id));
}

#[cfg(unix)]
#[tokio::test]
async fn crash_surfaces_a_single_error() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = Arc::new(JsonLibrary::open(tmp.path().join("library.json")).unwrap());
    let id = add(&lib, "crash", "/bin/sh", "-c 'kill -SEGV $$'");
    let launcher = launcher(&LauncherConfig::default(), lib, Arc::default());

    let runner = launcher.play(&id).await.unwrap();
    let state = timeout(LIMIT, runner.wait()).await.unwrap();
    assert_eq!(
        state,
        RunnerState::Failed {
            fault: ProcessFailure::Crashed.into()
        }
    );
    let terminal: Vec<_> = runner
        .history()
        .into_iter()
        .filter(|t| t.to.is_terminal())
        .collect();
    assert_eq!(terminal.len(), 1);
    assert!(launcher.tracked_games().is_empty());
}
