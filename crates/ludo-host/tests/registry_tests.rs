// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tests for the process registry.
#![cfg(unix)]

use ludo_core::{GameId, LaunchSpec, ResolvedCommand, RunnerEvent};
use ludo_host::{
    DetachedRunner, ManagedRunner, ProcessRegistry, Runner, SupervisorSettings, UrlOpener,
    UrlRunner,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(10);

fn sh(script: &str) -> ResolvedCommand {
    LaunchSpec::new("/bin/sh")
        .with_arguments(format!("-c '{script}'"))
        .resolve()
        .unwrap()
}

fn managed(game: &str, script: &str) -> Runner {
    ManagedRunner::new(GameId::new(game), sh(script), SupervisorSettings::default()).into()
}

struct NeverOpen;

impl UrlOpener for NeverOpen {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        panic!("not expected to open anything")
    }
}

#[tokio::test]
async fn tracked_runner_is_removed_when_it_stops() {
    let registry = ProcessRegistry::new();
    let game = GameId::new("g1");
    let runner = managed("g1", "exec sleep 30");

    assert!(registry.add_process(&runner));
    runner.run().await.unwrap();
    assert!(registry.is_running(&game));
    assert!(registry.get_runner(&game).unwrap().ptr_eq(&runner));
    assert_eq!(registry.tracked(), vec![game.clone()]);

    let mut rx = runner.subscribe();
    assert!(timeout(LIMIT, registry.stop_game(&game)).await.unwrap());
    assert!(rx.recv().await.unwrap().is_terminal());
    assert!(registry.get_runner(&game).is_none());
    assert!(!registry.is_running(&game));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn entry_is_gone_when_the_terminal_event_arrives() {
    let registry = ProcessRegistry::new();
    let game = GameId::new("quick");
    let runner = managed("quick", "exit 0");
    registry.add_process(&runner);

    let mut rx = runner.subscribe();
    runner.run().await.unwrap();
    loop {
        let event = timeout(LIMIT, rx.recv()).await.unwrap().unwrap();
        if event.is_terminal() {
            assert_eq!(event, RunnerEvent::Stopped { exit_code: 0 });
            break;
        }
    }
    assert!(registry.get_runner(&game).is_none());
}

#[tokio::test]
async fn crash_removes_entry_without_explicit_removal() {
    let registry = ProcessRegistry::new();
    let game = GameId::new("crashy");
    let runner = managed("crashy", "kill -KILL $$");
    registry.add_process(&runner);
    runner.run().await.unwrap();
    timeout(LIMIT, runner.wait()).await.unwrap();
    assert!(registry.get_runner(&game).is_none());
}

#[tokio::test]
async fn first_registration_wins() {
    let registry = ProcessRegistry::new();
    let game = GameId::new("g");
    let first = managed("g", "exec sleep 30");
    let second = managed("g", "exec sleep 30");

    assert!(registry.add_process(&first));
    assert!(!registry.add_process(&second));
    assert_eq!(registry.len(), 1);
    assert!(registry.get_runner(&game).unwrap().ptr_eq(&first));

    // A second registration of the same runner is also a no-op.
    assert!(!registry.add_process(&first));
    registry.remove_process(&game);
    registry.remove_process(&game);
    assert!(registry.get_runner(&game).is_none());
}

#[tokio::test]
async fn unstoppable_runners_are_never_tracked() {
    let registry = ProcessRegistry::new();
    let command = LaunchSpec::new("/bin/true").resolve().unwrap();
    let detached: Runner = DetachedRunner::new(GameId::new("d"), command).into();
    let web: Runner = UrlRunner::new(GameId::new("w"), "https://example.com", Arc::new(NeverOpen)).into();

    assert!(!registry.add_process(&detached));
    assert!(!registry.add_process(&web));
    detached.run().await.unwrap();
    assert!(registry.is_empty());
    assert!(!registry.is_running(&GameId::new("d")));
    assert!(!registry.stop_game(&GameId::new("d")).await);
}

#[tokio::test]
async fn finished_runner_cannot_be_registered() {
    let registry = ProcessRegistry::new();
    let runner = managed("late", "exit 0");
    runner.run().await.unwrap();
    timeout(LIMIT, runner.wait()).await.unwrap();

    assert!(!registry.add_process(&runner));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn clones_share_the_table() {
    let registry = ProcessRegistry::new();
    let view = registry.clone();
    let runner = managed("shared", "exec sleep 30");
    registry.add_process(&runner);
    runner.run().await.unwrap();

    assert!(view.is_running(&GameId::new("shared")));
    assert!(timeout(LIMIT, view.stop_game(&GameId::new("shared"))).await.unwrap());
    assert!(registry.is_empty());
}
