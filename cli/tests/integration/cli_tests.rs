//! Integration tests for the CLI skeleton: help, version, global flags.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn amibake() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("amibake"));
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_cli_no_args_shows_help_and_exits_two() {
    amibake().assert().code(2).stderr(predicate::str::contains(
        "Bake unikernels into bootable EC2 machine images",
    ));
}

#[test]
fn test_cli_help_lists_commands() {
    amibake()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("launch"))
        .stdout(predicate::str::contains("compile"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_version_flag_shows_version() {
    amibake()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amibake"));
}

#[test]
fn test_version_command_shows_version() {
    amibake()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amibake 0.1.0"));
}

#[test]
fn test_no_color_env_accepts_any_value() {
    for value in ["1", "true", "0", ""] {
        amibake()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("amibake 0.1.0"));
    }
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let output = amibake()
        .args(["version", "--json"])
        .output()
        .expect("run amibake");
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(value["version"], "0.1.0");
}

#[test]
fn test_build_help_shows_pipeline_flags() {
    amibake()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--artifact"))
        .stdout(predicate::str::contains("--zone"))
        .stdout(predicate::str::contains("--region"))
        .stdout(predicate::str::contains("--source-dir"));
}

#[test]
fn test_build_requires_artifact() {
    amibake()
        .arg("build")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--artifact"));
}

#[test]
fn test_compile_rejects_unknown_target() {
    amibake()
        .args(["compile", ".", "--target", "solaris"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("xen"));
}

#[test]
fn test_compile_missing_source_dir_fails_before_building() {
    amibake()
        .args(["compile", "/nonexistent/amibake-src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
