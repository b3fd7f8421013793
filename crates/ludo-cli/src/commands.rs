// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations for the `ludo` binary.

use anyhow::{Context, Result};
use ludo_config::{ConfigWarning, LauncherConfig};
use ludo_core::{GameId, OutputStream, RunnerEvent, RunnerState};
use ludo_host::{LaunchSettings, Launcher, SystemOpener};
use ludo_store::{Game, JsonLibrary, RunnerKind};
use schemars::schema_for;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Library file used when neither `--library` nor the config names one.
const DEFAULT_LIBRARY: &str = ".ludo/library.json";

/// `--library`, else the configured path, else `~/.ludo/library.json`.
pub fn library_path(flag: Option<PathBuf>, config: &LauncherConfig) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    if let Some(path) = &config.library_path {
        return PathBuf::from(path);
    }
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => PathBuf::from(home).join(DEFAULT_LIBRARY),
        None => PathBuf::from(DEFAULT_LIBRARY),
    }
}

fn open_library(path: &Path) -> Result<JsonLibrary> {
    JsonLibrary::open(path).with_context(|| format!("open library '{}'", path.display()))
}

pub fn cmd_list(library: &Path, json: bool) -> Result<ExitCode> {
    let games = open_library(library)?.all_games();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&games).context("serialize games")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    for game in &games {
        let last = game
            .last_played
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".into());
        println!("{}\t{}\t{}", game.id, game.title, last);
    }
    Ok(ExitCode::SUCCESS)
}

/// Fields of `ludo add`.
pub struct NewGame {
    pub title: String,
    pub target: String,
    pub args: String,
    pub cwd: String,
    pub runner: Option<RunnerKind>,
}

pub fn cmd_add(library: &Path, new: NewGame) -> Result<ExitCode> {
    let lib = open_library(library)?;
    let mut game = Game::new(new.title);
    while lib.game_exists(&game.id) {
        game.id = GameId::generate();
    }
    game.executable_path = new.target;
    game.launch_options = new.args;
    game.working_directory = new.cwd;
    game.runner = new.runner;

    let id = game.id.clone();
    lib.add_game(game).context("add game")?;
    println!("{id}");
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_remove(library: &Path, id: &str) -> Result<ExitCode> {
    let removed = open_library(library)?
        .delete_game(&GameId::new(id))
        .with_context(|| format!("remove game '{id}'"))?;
    println!("removed {} ({})", removed.id, removed.title);
    Ok(ExitCode::SUCCESS)
}

pub async fn cmd_play(library: &Path, config: &LauncherConfig, id: &str) -> Result<ExitCode> {
    let store = Arc::new(open_library(library)?);
    let launcher = Launcher::new(
        LaunchSettings::from(config),
        store,
        Arc::new(SystemOpener),
    );
    let game = GameId::new(id);

    let runner = launcher
        .prepare(&game)
        .with_context(|| format!("play game '{id}'"))?;
    let mut events = runner.subscribe();
    launcher
        .launch(&runner)
        .await
        .with_context(|| format!("play game '{id}'"))?;
    eprintln!("{}: started with {}", game, runner.name());

    if !runner.can_stop() {
        return Ok(ExitCode::SUCCESS);
    }

    let mut listening = true;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(RunnerEvent::Output { stream: OutputStream::Stdout, line }) => println!("{line}"),
                Ok(RunnerEvent::Output { stream: OutputStream::Stderr, line }) => eprintln!("{line}"),
                Ok(event) if event.is_terminal() => break,
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!(target: "ludo.launcher", skipped = n, "output lagged"),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) => {
                    info!(target: "ludo.launcher", game = %game, "interrupted, stopping");
                    launcher.stop_all().await;
                }
                Err(e) => {
                    warn!(target: "ludo.launcher", error = %e, "cannot listen for Ctrl-C");
                    listening = false;
                }
            },
        }
    }

    let state = runner.wait().await;
    eprintln!("{game}: {state}");
    Ok(match state {
        RunnerState::Terminated { exit_code } => {
            ExitCode::from(u8::try_from(exit_code).unwrap_or(1))
        }
        _ => ExitCode::FAILURE,
    })
}

pub fn cmd_config(
    config: &LauncherConfig,
    warnings: &[ConfigWarning],
    schema: bool,
) -> Result<ExitCode> {
    if schema {
        let value = serde_json::to_value(schema_for!(LauncherConfig))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("serialize schema")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", config.to_toml().context("render configuration")?);
    for w in warnings {
        eprintln!("warning: {w}");
    }
    Ok(ExitCode::SUCCESS)
}
