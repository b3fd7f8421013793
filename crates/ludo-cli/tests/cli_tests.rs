// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the `ludo` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::path::{Path, PathBuf};

fn ludo() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("ludo").expect("binary `ludo` should be built");
    for var in [
        "LUDO_LOG_LEVEL",
        "LUDO_LIBRARY",
        "LUDO_DETACHED",
        "LUDO_KILL_TIMEOUT_MS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn library(dir: &Path) -> PathBuf {
    dir.join("library.json")
}

/// Add a game and return its id.
fn add(lib: &Path, args: &[&str]) -> String {
    let out = ludo()
        .arg("--library")
        .arg(lib)
        .arg("add")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    String::from_utf8(out).unwrap().trim().to_string()
}

// ── Help ────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    ludo()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Ludo game launcher"))
        .stdout(contains("list"))
        .stdout(contains("play"))
        .stdout(contains("config"));
}

// ── Library management ──────────────────────────────────────────────

#[test]
fn add_then_list() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(tmp.path());
    let id = add(&lib, &["--title", "Quake", "--target", "/games/quake"]);
    assert!(!id.is_empty());

    ludo()
        .arg("--library")
        .arg(&lib)
        .arg("list")
        .assert()
        .success()
        .stdout(contains(id.as_str()))
        .stdout(contains("Quake"))
        .stdout(contains("never"));
}

#[test]
fn list_json_is_an_array_of_games() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(tmp.path());
    add(&lib, &["--title", "Doom", "--target", "/games/doom", "--args", "-fast"]);

    let out = ludo()
        .arg("--library")
        .arg(&lib)
        .args(["list", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let games: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(games[0]["title"], "Doom");
    assert_eq!(games[0]["launchOptions"], "-fast");
}

#[test]
fn remove_unknown_game_fails() {
    let tmp = tempfile::tempdir().unwrap();
    ludo()
        .arg("--library")
        .arg(library(tmp.path()))
        .args(["remove", "nope"])
        .assert()
        .failure()
        .stderr(contains("game not found: nope"));
}

#[test]
fn remove_deletes_the_game() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(tmp.path());
    let id = add(&lib, &["--title", "Gone"]);
    ludo()
        .arg("--library")
        .arg(&lib)
        .args(["remove", &id])
        .assert()
        .success();
    ludo()
        .arg("--library")
        .arg(&lib)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("Gone").not());
}

// ── Play ────────────────────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn play_true_exits_cleanly() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(tmp.path());
    let id = add(&lib, &["--title", "True", "--target", "/bin/true"]);

    ludo()
        .arg("--library")
        .arg(&lib)
        .args(["play", &id])
        .assert()
        .success()
        .stderr(contains("started with Default Runner"))
        .stderr(contains("terminated (exit code 0)"));
}

#[cfg(unix)]
#[test]
fn play_prints_output_and_forwards_exit_code() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(tmp.path());
    let id = add(
        &lib,
        &["--title", "Shell", "--target", "/bin/sh", "--args", "-c 'echo hi; exit 3'"],
    );

    ludo()
        .arg("--library")
        .arg(&lib)
        .args(["play", &id])
        .assert()
        .code(3)
        .stdout(contains("hi"));
}

#[test]
fn play_empty_game_is_an_invalid_spec() {
    let tmp = tempfile::tempdir().unwrap();
    let lib = library(tmp.path());
    let id = add(&lib, &["--title", "Nothing"]);

    ludo()
        .arg("--library")
        .arg(&lib)
        .args(["play", &id])
        .assert()
        .failure()
        .stderr(contains("invalid launch spec"));

    ludo()
        .arg("--library")
        .arg(&lib)
        .arg("list")
        .assert()
        .success()
        .stdout(contains("never"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_prints_defaults() {
    ludo()
        .arg("config")
        .assert()
        .success()
        .stdout(contains("kill_timeout_ms = 5000"))
        .stdout(contains("last_played = \"on_launch\""));
}

#[test]
fn config_env_override_is_applied() {
    ludo()
        .env("LUDO_KILL_TIMEOUT_MS", "1234")
        .arg("config")
        .assert()
        .success()
        .stdout(contains("kill_timeout_ms = 1234"));
}

#[test]
fn config_schema_is_json() {
    let out = ludo()
        .args(["config", "--schema"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let schema: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(schema["properties"]["kill_timeout_ms"].is_object());
}

#[test]
fn config_warnings_go_to_stderr() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("ludo.toml");
    std::fs::write(&path, "detached = true\n").unwrap();
    ludo()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(contains("detached = true"))
        .stderr(contains("warning: detached mode"));
}

#[test]
fn invalid_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("ludo.toml");
    std::fs::write(&path, "log_level = \"loud\"\n").unwrap();
    ludo()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure()
        .stderr(contains("loud"));
}

#[test]
fn missing_config_file_fails() {
    ludo()
        .args(["--config", "/no/such/ludo.toml", "config"])
        .assert()
        .failure()
        .stderr(contains("config file not found"));
}
