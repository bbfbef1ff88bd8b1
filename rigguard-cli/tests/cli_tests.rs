//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn rigguard_cli() -> Command {
    cargo_bin_cmd!("rigguard-cli")
}

/// Path to rigguard library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("rigguard")
        .join("tests")
        .join("fixtures")
}

fn catalog() -> PathBuf {
    fixtures_dir().join("catalog.json")
}

fn build(name: &str) -> PathBuf {
    fixtures_dir().join("builds").join(name)
}

#[test]
fn test_cli_help() {
    let mut cmd = rigguard_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("compatibility"));
}

#[test]
fn test_cli_version() {
    let mut cmd = rigguard_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_analyze_excellent_build() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("excellent.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("EXCELLENT"))
        .stdout(predicate::str::contains("score 100"));
}

#[test]
fn test_cli_analyze_socket_mismatch() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("socket_mismatch.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("CRITICAL"))
        .stdout(predicate::str::contains("Ryzen 5 5600X"));
}

#[test]
fn test_cli_fail_on_thresholds() {
    let mut cmd = rigguard_cli();
    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("socket_mismatch.json"))
        .arg("--fail-on")
        .arg("critical");
    cmd.assert().code(1);

    // A power warning alone does not trip the critical threshold.
    let mut cmd = rigguard_cli();
    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("tight_power.json"))
        .arg("--fail-on")
        .arg("critical");
    cmd.assert().code(0);

    let mut cmd = rigguard_cli();
    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("tight_power.json"))
        .arg("--fail-on")
        .arg("warning");
    cmd.assert().code(1);
}

#[test]
fn test_cli_partial_build() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("missing_ram.json"))
        .arg("--partial")
        .arg("--fail-on")
        .arg("critical");

    cmd.assert()
        .code(0)
        .stdout(predicate::str::contains("Missing memory"));
}

#[test]
fn test_cli_json_output() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("tight_power.json"))
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["build"], "Tight power");
    assert_eq!(value["result"]["overall_status"], "warning");
    assert_eq!(value["power"]["total_draw"], 600);
    assert_eq!(value["power"]["verdict"], "borderline");
}

#[test]
fn test_cli_github_format() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(build("socket_mismatch.json"))
        .arg("--format")
        .arg("github");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("::error file="));
}

#[test]
fn test_cli_pair() {
    let mut cmd = rigguard_cli();
    cmd.arg("--catalog").arg(catalog()).arg("pair").arg("1").arg("3");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("are compatible"));

    let mut cmd = rigguard_cli();
    cmd.arg("--catalog").arg(catalog()).arg("pair").arg("3").arg("2");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("NOT compatible"))
        .stdout(predicate::str::contains("blocking"));
}

#[test]
fn test_cli_compatible() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("compatible")
        .arg("1")
        .arg("--type")
        .arg("mb");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Z790 Gaming"));
}

#[test]
fn test_cli_unknown_type_is_rejected() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("compatible")
        .arg("1")
        .arg("--type")
        .arg("toaster");

    cmd.assert().failure();
}

#[test]
fn test_cli_power() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog")
        .arg(catalog())
        .arg("power")
        .arg(build("tight_power.json"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("600W of 650W"));
}

#[test]
fn test_cli_missing_catalog() {
    let mut cmd = rigguard_cli();

    cmd.arg("analyze").arg(build("excellent.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("--catalog"));
}

#[test]
fn test_cli_unknown_component() {
    let mut cmd = rigguard_cli();

    cmd.arg("--catalog").arg(catalog()).arg("pair").arg("1").arg("999");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("#999"));
}

#[test]
fn test_cli_rules_command() {
    let mut cmd = rigguard_cli();

    cmd.arg("rules");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Active compatibility rules: 10"))
        .stdout(predicate::str::contains("R1"));
}

#[test]
fn test_cli_rules_from_file() {
    let mut cmd = rigguard_cli();

    cmd.arg("--rules")
        .arg(fixtures_dir().join("rules.json"))
        .arg("rules")
        .arg("--detailed")
        .arg("--conflicts");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Active compatibility rules: 3"))
        .stdout(predicate::str::contains("Rejected records"))
        .stdout(predicate::str::contains("BALANCED"))
        .stdout(predicate::str::contains("No conflicting rules"));
}

#[test]
fn test_cli_build_from_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.json");
    std::fs::write(&path, r#"{"name": "Empty", "components": []}"#).unwrap();

    let mut cmd = rigguard_cli();
    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(&path)
        .arg("--partial");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("EXCELLENT"));

    let mut cmd = rigguard_cli();
    cmd.arg("--catalog")
        .arg(catalog())
        .arg("analyze")
        .arg(&path)
        .arg("--fail-on")
        .arg("critical");
    cmd.assert().code(1);
}
