//! CLI argument handling and exit codes that need no generator.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A command isolated from the caller's config files and environment.
fn boidfactory(workdir: &TempDir) -> Command {
    // The marker stops upward config discovery at the temp dir.
    fs::create_dir_all(workdir.path().join(".git")).unwrap();
    let mut cmd = Command::cargo_bin("boidfactory").unwrap();
    cmd.current_dir(workdir.path())
        .env_remove("BOIDFACTORY_THINKING")
        .env_remove("BOIDFACTORY_CORRECTION")
        .env_remove("BOIDFACTORY_GENERATOR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("models"));
}

#[test]
fn unknown_flag_exits_2() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args(["run", "--prompt", "boids", "--frobnicate"])
        .assert()
        .code(2);
}

#[test]
fn missing_prompt_exits_2() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args(["plan", "-m", "qwen3:8b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no prompt given"));
}

#[test]
fn missing_prompt_file_exits_2() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args(["run", "--prompt-file", "nope.md", "-m", "qwen3:8b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read prompt file"));
}

#[test]
fn empty_prompt_file_exits_2() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("blank.md"), "\n\n").unwrap();
    boidfactory(&temp)
        .args(["plan", "--prompt-file", "blank.md", "-m", "qwen3:8b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("prompt is empty"));
}

#[test]
fn no_models_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args(["plan", "--prompt", "boids"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("models"));
}

#[test]
fn zero_times_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args(["plan", "--prompt", "boids", "-m", "a", "-n", "0"])
        .assert()
        .code(2);
}

#[test]
fn garbage_boolean_env_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .env("BOIDFACTORY_CORRECTION", "sometimes")
        .args(["plan", "--prompt", "boids", "-m", "a"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("BOIDFACTORY_CORRECTION"));
}

#[test]
fn missing_generator_exits_2() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args([
            "--generator",
            "boidfactory-no-such-generator",
            "run",
            "--prompt",
            "boids",
            "-m",
            "a",
            "--out-dir",
            "out",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("boidfactory-no-such-generator"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn plan_prints_paths_without_creating_anything() {
    let temp = TempDir::new().unwrap();
    boidfactory(&temp)
        .args([
            "plan", "--prompt", "boids", "-m", "qwen3:8b", "-n", "3", "-p", "8", "--out-dir", "out",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jobs: 3 (1 model(s) x 3 run(s), 3 at a time)"))
        .stdout(predicate::str::is_match(r"_03-implementation\.html").unwrap())
        .stdout(predicate::str::contains("[cli]"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn plan_json_reports_attribution() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join(".boidfactory");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[run]\nmodels = [\"gemma3:12b\"]\ntimes = 2\npipeline = \"direct\"\n",
    )
    .unwrap();

    let output = boidfactory(&temp)
        .env("BOIDFACTORY_THINKING", "0")
        .args(["plan", "--prompt", "boids", "-p", "2", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["stages"], serde_json::json!(["implementation"]));
    assert_eq!(plan["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(plan["config"]["models"]["source"], "config");
    assert_eq!(plan["config"]["parallelism"]["source"], "cli");
    assert_eq!(plan["config"]["thinking"]["value"], "false");
    assert_eq!(plan["config"]["thinking"]["source"], "env");
    assert!(plan["run_dir"].as_str().unwrap().contains("boids-"));
}
