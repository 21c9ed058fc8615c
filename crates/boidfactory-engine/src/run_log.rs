//! Append-only batch log (`run.log` in the run directory).
//!
//! Every line is written with a single `write` on a handle opened in append
//! mode, so lines from concurrent jobs (and concurrent processes sharing a
//! run directory) never interleave. Each job ends with exactly one terminal
//! line: `completed`, `empty-artifact`, or `failed`.

use std::fs::OpenOptions;
use std::io::{self, Write};

use boidfactory_config::PipelineConfig;
use boidfactory_lock::LockHolder;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

pub const RUN_LOG_FILE_NAME: &str = "run.log";

#[derive(Debug, Clone)]
pub struct RunLog {
    path: Utf8PathBuf,
}

impl RunLog {
    /// Create `run.log` in `run_dir` if it does not exist yet.
    pub fn open(run_dir: &Utf8Path) -> io::Result<Self> {
        let path = run_dir.join(RUN_LOG_FILE_NAME);
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn append(&self, event: &str, fields: &str) -> io::Result<()> {
        let line = format!(
            "{} {event} {fields}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
        );
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Batch configuration, one line.
    pub fn batch_started(&self, config: &PipelineConfig, run_uuid: Uuid) -> io::Result<()> {
        let stages: Vec<&str> = config.stages.iter().map(|s| s.name.as_str()).collect();
        self.append(
            "batch-started",
            &format!(
                "run={run_uuid} models={} times={} parallelism={} thinking={} correction={} stages={} generator={}",
                config.model_ids.join(","),
                config.times,
                config.parallelism,
                config.thinking_enabled,
                config.correction_enabled,
                stages.join(">"),
                config.generator.program,
            ),
        )
    }

    /// A job became the console holder.
    pub fn console_acquired(&self, holder: &LockHolder) -> io::Result<()> {
        self.append(
            "console-lock",
            &format!(
                "job={} model={} pid={} acquired_at={}",
                holder.job_index,
                holder.model,
                holder.pid,
                holder.acquired_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
            ),
        )
    }

    pub fn job_completed(&self, model: &str, index: u32, artifact: &Utf8Path) -> io::Result<()> {
        self.append("completed", &format!("job={index} model={model} artifact={artifact}"))
    }

    pub fn job_empty_artifact(&self, model: &str, index: u32, artifact: &Utf8Path) -> io::Result<()> {
        self.append("empty-artifact", &format!("job={index} model={model} artifact={artifact}"))
    }

    /// `artifact` is the planned final path; it may be missing or partial.
    pub fn job_failed(
        &self,
        model: &str,
        index: u32,
        artifact: &Utf8Path,
        stage: Option<&str>,
        error: &str,
    ) -> io::Result<()> {
        self.append(
            "failed",
            &format!(
                "job={index} model={model} artifact={artifact} stage={} error={}",
                stage.unwrap_or("-"),
                single_line(error)
            ),
        )
    }

    pub fn correction_written(&self, model: &str, index: u32, artifact: &Utf8Path) -> io::Result<()> {
        self.append("corrected", &format!("job={index} model={model} artifact={artifact}"))
    }

    pub fn correction_skipped(&self, model: &str, index: u32, reason: &str) -> io::Result<()> {
        self.append(
            "correction-skipped",
            &format!("job={index} model={model} reason={}", single_line(reason)),
        )
    }

    pub fn correction_failed(&self, model: &str, index: u32, reason: &str) -> io::Result<()> {
        self.append(
            "correction-failed",
            &format!("job={index} model={model} reason={}", single_line(reason)),
        )
    }

    pub fn batch_finished(&self, ok: usize, empty: usize, failed: usize) -> io::Result<()> {
        self.append("batch-finished", &format!("ok={ok} empty={empty} failed={failed}"))
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
