//! End-to-end batches against the generator-stub binary.
//!
//! Gated behind the `dev-tools` feature.
//!
//! Run with: `cargo test --features dev-tools --test end_to_end_cli`

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temp workspace with a config pointing the generator and linter at the stub.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let config_dir = dir.path().join(".boidfactory");
        fs::create_dir_all(&config_dir).unwrap();

        let stub = assert_cmd::cargo::cargo_bin!("generator-stub");
        let stub = stub.display();
        fs::write(
            config_dir.join("config.toml"),
            format!(
                "[generator]\n\
                 program = '{stub}'\n\
                 run_args = [\"--no-sleep\", \"run\"]\n\
                 list_args = [\"list\"]\n\
                 \n\
                 [correction]\n\
                 program = '{stub}'\n\
                 args = [\"lint\"]\n"
            ),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn out(&self) -> PathBuf {
        self.path().join("out")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("boidfactory").unwrap();
        cmd.current_dir(self.path())
            .env_remove("BOIDFACTORY_THINKING")
            .env_remove("BOIDFACTORY_CORRECTION")
            .env_remove("BOIDFACTORY_GENERATOR")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `run --json` with the given extra args; returns the parsed summary.
    fn run_json(&self, extra: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(["run", "--json", "--prompt", "a flock of boids", "--out-dir", "out"])
            .args(extra)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn files_with_suffix(&self, suffix: &str) -> Vec<PathBuf> {
        let mut files: Vec<_> = fs::read_dir(self.out())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(suffix))
            .collect();
        files.sort();
        files
    }

    fn run_log(&self) -> String {
        fs::read_to_string(self.out().join("run.log")).unwrap()
    }
}

fn states(summary: &Value) -> Vec<String> {
    summary["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["status"]["state"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn four_runs_two_at_a_time() {
    let ws = Workspace::new();
    let summary = ws.run_json(&["-m", "qwen3:8b", "-n", "4", "-p", "2"]);

    assert_eq!(states(&summary), vec!["completed"; 4]);
    assert_eq!(ws.files_with_suffix("-spec.md").len(), 4);
    let pages = ws.files_with_suffix("-implementation.html");
    assert_eq!(pages.len(), 4);

    for page in &pages {
        let html = fs::read_to_string(page).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"), "{html}");
        assert!(html.ends_with("</html>"), "{html}");
        assert!(!html.contains("Let me know"));
        // The first stage's output was piped to the implementation stage.
        assert!(!html.contains("<!-- input bytes: 0 -->"));
    }

    let log = ws.run_log();
    assert_eq!(log.lines().filter(|l| l.contains(" completed ")).count(), 4);
    assert_eq!(log.lines().filter(|l| l.contains(" batch-started ")).count(), 1);
    assert!(log.lines().last().unwrap().contains("batch-finished ok=4 empty=0 failed=0"));
}

#[test]
fn spec_files_keep_the_raw_reply() {
    let ws = Workspace::new();
    ws.run_json(&["-m", "gemma3:12b"]);
    let specs = ws.files_with_suffix("-spec.md");
    assert_eq!(specs.len(), 1);
    let spec = fs::read_to_string(&specs[0]).unwrap();
    assert!(spec.contains("# Boids specification"));
    assert!(spec.contains("_Drafted by gemma3:12b._"));
}

#[test]
fn failing_model_does_not_stop_the_batch() {
    let ws = Workspace::new();
    let summary = ws.run_json(&["-m", "qwen3:8b,fail-model", "-n", "2", "-p", "2"]);

    let jobs = summary["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 4);
    for job in jobs {
        let expected = if job["model"] == "fail-model" {
            "failed"
        } else {
            "completed"
        };
        assert_eq!(job["status"]["state"], expected, "{job}");
    }
    let failure = jobs.iter().find(|j| j["model"] == "fail-model").unwrap();
    assert_eq!(failure["status"]["stage"], "spec");
    assert!(failure["status"]["error"].as_str().unwrap().contains("not found"));

    let log = ws.run_log();
    let failed: Vec<_> = log.lines().filter(|l| l.contains(" failed job=")).collect();
    assert_eq!(failed.len(), 2);
    let path = failure["final_path"].as_str().unwrap();
    assert!(failed.iter().any(|l| l.contains(&format!("artifact={path}"))), "{log}");
    assert!(log.contains("batch-finished ok=2 empty=0 failed=2"));
}

#[test]
fn reply_without_document_leaves_an_empty_artifact() {
    let ws = Workspace::new();
    let summary = ws.run_json(&["-m", "nodoc-model"]);
    assert_eq!(states(&summary), vec!["empty-artifact"]);

    let pages = ws.files_with_suffix("-implementation.html");
    assert_eq!(pages.len(), 1);
    assert_eq!(fs::read_to_string(&pages[0]).unwrap(), "");
    assert!(ws.run_log().contains(" empty-artifact job=1 model=nodoc-model"));
}

#[test]
fn correction_without_a_linter_is_rejected_before_any_job() {
    let ws = Workspace::new();
    let config_path = ws.path().join(".boidfactory/config.toml");
    let config = fs::read_to_string(&config_path).unwrap();
    let (generator, _) = config.split_once("[correction]").unwrap();
    fs::write(
        &config_path,
        format!("{generator}[correction]\nprogram = 'boidfactory-no-such-linter'\n"),
    )
    .unwrap();

    ws.cmd()
        .args(["run", "--prompt", "a flock of boids", "--out-dir", "out", "-m", "qwen3:8b", "--correct"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("correction.program"))
        .stderr(predicate::str::contains("boidfactory-no-such-linter"));
    assert!(!ws.out().exists());

    // Without --correct the linter is never looked up.
    let summary = ws.run_json(&["-m", "qwen3:8b"]);
    assert_eq!(states(&summary), vec!["completed"]);
}

#[test]
fn correction_writes_a_fixed_copy_and_keeps_the_original() {
    let ws = Workspace::new();
    let summary = ws.run_json(&["-m", "qwen3:8b", "-n", "2", "-p", "2", "--correct"]);
    assert_eq!(states(&summary), vec!["completed"; 2]);

    let fixed = ws.files_with_suffix("-implementation.fixed.html");
    assert_eq!(fixed.len(), 2);
    for path in &fixed {
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("<html lang=\"en\">"), "{html}");
    }
    let originals = ws.files_with_suffix("-implementation.html");
    assert_eq!(originals.len(), 2);
    for path in &originals {
        assert!(!fs::read_to_string(path).unwrap().contains("lang="));
    }

    for job in summary["jobs"].as_array().unwrap() {
        assert!(job["corrected_path"].as_str().unwrap().ends_with(".fixed.html"));
    }
    assert_eq!(
        ws.run_log().lines().filter(|l| l.contains(" corrected ")).count(),
        2
    );
}

#[test]
fn thinking_output_is_stripped_from_the_document() {
    let ws = Workspace::new();
    let summary = ws.run_json(&["-m", "qwen3:8b", "--thinking", "--pipeline", "direct"]);
    assert_eq!(states(&summary), vec!["completed"]);

    let page = &ws.files_with_suffix("-implementation.html")[0];
    let html = fs::read_to_string(page).unwrap();
    assert!(!html.contains("Thinking..."));
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(ws.files_with_suffix("-spec.md").is_empty());
}

#[test]
fn stage_timeout_fails_the_job() {
    let ws = Workspace::new();
    let summary = ws.run_json(&["-m", "hang-model", "--pipeline", "direct", "--stage-timeout", "5"]);
    assert_eq!(states(&summary), vec!["failed"]);
    let error = summary["jobs"][0]["status"]["error"].as_str().unwrap();
    assert!(error.contains("timed out"), "{error}");
}

#[test]
fn console_streams_one_job_at_a_time() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["run", "--prompt", "boids", "-m", "qwen3:8b", "-n", "3", "-p", "3", "--out-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("==> "))
        .stdout(predicate::str::contains("Created:"))
        .stdout(predicate::str::contains("3 completed, 0 empty, 0 failed"));

    assert!(ws.out().join(".console.lock").exists());
    let holders = ws
        .run_log()
        .lines()
        .filter(|l| l.contains(" console-lock "))
        .count();
    assert!(holders >= 1, "at least one job must have held the console");
}

#[test]
fn quiet_run_prints_only_the_summary() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["run", "-q", "--prompt", "boids", "-m", "qwen3:8b", "--out-dir", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("==> ").not())
        .stdout(predicate::str::contains("1 completed, 0 empty, 0 failed"));
}

#[test]
fn models_hides_embedding_models() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("models")
        .assert()
        .success()
        .stdout(predicate::str::contains("qwen3:8b"))
        .stdout(predicate::str::contains("llama3.2:3b"))
        .stdout(predicate::str::contains("nomic-embed-text").not());
}

#[test]
fn random_models_are_reproducible_with_a_seed() {
    let ws = Workspace::new();
    let plan = |ws: &Workspace| -> Value {
        let output = ws
            .cmd()
            .args(["plan", "--json", "--prompt", "boids", "--random-models", "2", "--seed", "7"])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap()
    };

    let first = plan(&ws);
    let second = plan(&ws);
    assert_eq!(first["config"]["models"], second["config"]["models"]);

    let models = first["config"]["models"]["value"].as_str().unwrap();
    assert_eq!(models.split(',').count(), 2);
    assert!(!models.contains("embed"));
}

#[test]
fn asking_for_more_random_models_than_installed_is_rejected() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["plan", "--prompt", "boids", "--random-models", "9"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("random_models"));
}
