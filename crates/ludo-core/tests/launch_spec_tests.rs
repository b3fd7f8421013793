// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tests for command construction and working-directory resolution.

use ludo_core::{LaunchError, LaunchSpec};
use proptest::prelude::*;
use std::path::PathBuf;

// ── Tokenization ────────────────────────────────────────────────────

#[test]
fn empty_target_and_arguments_is_invalid() {
    let spec = LaunchSpec::from_parts("", "", "");
    assert!(!spec.is_launchable());
    let err = spec.command().unwrap_err();
    assert_eq!(err.code(), "INVALID_SPEC");
    assert!(matches!(spec.resolve(), Err(LaunchError::InvalidSpec { .. })));
}

#[test]
fn target_with_simple_arguments() {
    let spec = LaunchSpec::new("/opt/game/run").with_arguments("-a -b");
    assert_eq!(spec.command().unwrap(), vec!["/opt/game/run", "-a", "-b"]);
}

#[test]
fn quoted_arguments_stay_single_tokens() {
    let spec = LaunchSpec::new("game.exe").with_arguments(r#""-file" "C:\a b\c.txt""#);
    assert_eq!(
        spec.command().unwrap(),
        vec!["game.exe", "-file", r"C:\a b\c.txt"]
    );
}

#[test]
fn arguments_alone_form_the_command() {
    let spec = LaunchSpec::from_parts("", "wine 'My Game/setup.exe' --silent", "");
    assert_eq!(
        spec.command().unwrap(),
        vec!["wine", "My Game/setup.exe", "--silent"]
    );
}

#[test]
fn unbalanced_quotes_are_invalid() {
    let spec = LaunchSpec::new("/bin/echo").with_arguments(r#""unterminated"#);
    let err = spec.command().unwrap_err();
    assert!(matches!(err, LaunchError::InvalidSpec { .. }), "{err:?}");
}

#[test]
fn whitespace_only_arguments_without_target_is_invalid() {
    let spec = LaunchSpec::from_parts("", "   ", "");
    assert!(matches!(spec.command(), Err(LaunchError::InvalidSpec { .. })));
}

// ── Working directory ───────────────────────────────────────────────

#[test]
fn explicit_working_directory_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = tmp.path().join("game.sh");
    std::fs::write(&exe, "#!/bin/sh\n").unwrap();

    let spec = LaunchSpec::new(exe.to_string_lossy()).with_working_directory("/elsewhere");
    let resolved = spec.resolve().unwrap();
    assert_eq!(resolved.working_dir, PathBuf::from("/elsewhere"));
}

#[test]
fn working_directory_defaults_to_target_parent() {
    let tmp = tempfile::tempdir().unwrap();
    let exe = tmp.path().join("game.sh");
    std::fs::write(&exe, "#!/bin/sh\n").unwrap();

    let resolved = LaunchSpec::new(exe.to_string_lossy())
        .with_arguments("--fullscreen")
        .resolve()
        .unwrap();
    assert_eq!(resolved.working_dir, tmp.path());
    assert_eq!(resolved.args, vec!["--fullscreen"]);
}

#[test]
fn missing_target_file_without_directory_fails() {
    let spec = LaunchSpec::new("/definitely/not/here/game.bin");
    let err = spec.resolve().unwrap_err();
    assert_eq!(
        err,
        LaunchError::NoWorkingDirectory {
            program: "/definitely/not/here/game.bin".into()
        }
    );
    assert_eq!(err.code(), "NO_WORKING_DIRECTORY");
}

#[test]
fn directory_target_is_not_a_regular_file() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = LaunchSpec::new(tmp.path().to_string_lossy());
    assert!(matches!(
        spec.resolve(),
        Err(LaunchError::NoWorkingDirectory { .. })
    ));
}

#[test]
fn display_quotes_tokens_with_spaces() {
    let resolved = LaunchSpec::new("/bin/echo")
        .with_arguments(r#""a b" c"#)
        .with_working_directory("/tmp")
        .resolve()
        .unwrap();
    assert_eq!(resolved.to_string(), "/bin/echo 'a b' c");
}

// ── Properties ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn plain_target_prefixes_split_arguments(target in "[a-zA-Z0-9_./-]{1,24}") {
        let spec = LaunchSpec::new(target.clone()).with_arguments("-a -b");
        prop_assert_eq!(spec.command().unwrap(), vec![target, "-a".to_string(), "-b".to_string()]);
    }

    #[test]
    fn quoted_word_survives_as_one_token(word in "[a-z]{1,8}( [a-z]{1,8}){1,3}") {
        let spec = LaunchSpec::new("run").with_arguments(format!("\"{word}\""));
        let command = spec.command().unwrap();
        prop_assert_eq!(command.len(), 2);
        prop_assert_eq!(&command[1], &word);
    }
}
