//! Integration tests for the generator-stub dev binary
//!
//! Gated behind the `dev-tools` feature.
//!
//! Run with: `cargo test --features dev-tools --test generator_stub_cli`

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::process::{Command, Stdio};

fn stub() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("generator-stub"));
    cmd.arg("--no-sleep");
    cmd.stdin(Stdio::null());
    cmd
}

#[test]
fn spec_instruction_gets_markdown() {
    stub()
        .args(["run", "--hidethinking", "qwen3:8b", "Write a specification for boids"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Boids specification"))
        .stdout(predicate::str::contains("Thinking").not());
}

#[test]
fn html_instruction_gets_noisy_document() {
    stub()
        .args(["run", "--think", "qwen3:8b", "Return one HTML file"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Thinking..."))
        .stdout(predicate::str::contains("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("Let me know if you want tweaks!"));
}

#[test]
fn stdin_is_consumed() {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("generator-stub"));
    cmd.args(["--no-sleep", "run", "m", "Build the HTML"])
        .write_stdin("0123456789")
        .assert()
        .success()
        .stdout(predicate::str::contains("<!-- input bytes: 10 -->"));
}

#[test]
fn failing_model_exits_non_zero() {
    stub()
        .args(["run", "fail-model", "anything"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn empty_scenario_prints_nothing() {
    stub()
        .args(["--scenario", "empty", "run", "qwen3:8b", "Return HTML"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn list_prints_a_table() {
    stub()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("NAME"))
        .stdout(predicate::str::contains("nomic-embed-text:latest"));
}

#[test]
fn lint_flags_missing_lang() {
    let temp = tempfile::tempdir().unwrap();
    let bad = temp.path().join("bad.html");
    let good = temp.path().join("good.html");
    std::fs::write(&bad, "<!DOCTYPE html>\n<html></html>").unwrap();
    std::fs::write(&good, "<!DOCTYPE html>\n<html lang=\"en\"></html>").unwrap();

    stub()
        .arg("lint")
        .arg(&bad)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("html-lang-require"));
    stub()
        .arg("lint")
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
