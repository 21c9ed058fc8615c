//! Bounded-parallel execution of a batch.
//!
//! Models run one after another. Within a model the run indices `1..=times`
//! are dispatched in order, and at most `parallelism` jobs run at once: a
//! job starts only after taking a semaphore permit, and returns it when it
//! finishes. Jobs run on blocking worker threads because each one drives a
//! child process synchronously.

use std::any::Any;
use std::collections::HashSet;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use boidfactory_config::PipelineConfig;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::chain::{ChainError, StageChain};
use crate::correction::{CorrectionLoop, DiagnosticsSource};
use crate::extract::{ArtifactExtractor, ExtractError};
use crate::generator::Generator;
use crate::job::{Console, JobContext, RunJob};
use crate::naming::NamingAuthority;
use crate::run_log::RunLog;
use crate::summary::{BatchSummary, JobReport, JobStatus};

/// Problems that stop a batch before any job runs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("could not prepare run directory {path}: {source}")]
    RunDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("job dispatch stopped unexpectedly")]
    Dispatch,
}

/// Every job of a batch with its paths fixed, before anything is written.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub naming: NamingAuthority,
    /// Distinct models in the order they run.
    pub models: Vec<String>,
    /// Ordered by model, then run index.
    pub jobs: Vec<RunJob>,
    pub parallelism: usize,
}

impl BatchPlan {
    /// Lay out a batch. Pure: nothing touches the filesystem.
    pub fn new(config: &PipelineConfig, started_at: DateTime<Local>, run_uuid: Uuid) -> Result<Self, SchedulerError> {
        let chain = Arc::new(StageChain::from_configs(&config.stages)?);
        let run_dir = NamingAuthority::run_dir_for(&config.output, started_at);
        let naming = NamingAuthority::new(run_dir, started_at, run_uuid, config.times);

        let mut seen = HashSet::new();
        let mut models = Vec::new();
        for model in &config.model_ids {
            if seen.insert(model.as_str()) {
                models.push(model.clone());
            } else {
                tracing::warn!(model = %model, "model listed more than once; running it once");
            }
        }

        let jobs = models
            .iter()
            .flat_map(|model| {
                let chain = Arc::clone(&chain);
                let naming = &naming;
                (1..=config.times).map(move |index| {
                    RunJob::plan(index, model, Arc::clone(&chain), naming, config.correction_enabled)
                })
            })
            .collect();

        Ok(Self {
            naming,
            models,
            jobs,
            parallelism: config.parallelism.clamp(1, config.times.max(1)) as usize,
        })
    }

    #[must_use]
    pub fn run_dir(&self) -> &Utf8Path {
        self.naming.run_dir()
    }
}

/// Runs batches against one generator.
pub struct JobScheduler {
    generator: Arc<dyn Generator>,
    diagnostics: Option<Arc<dyn DiagnosticsSource>>,
    console: Console,
}

impl JobScheduler {
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            diagnostics: None,
            console: Console::default(),
        }
    }

    /// Diagnostics used by the correction pass when it is enabled.
    #[must_use]
    pub fn with_diagnostics(mut self, source: Arc<dyn DiagnosticsSource>) -> Self {
        self.diagnostics = Some(source);
        self
    }

    #[must_use]
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Plan and run a batch starting now with a fresh run UUID.
    pub async fn run(&self, config: PipelineConfig) -> Result<BatchSummary, SchedulerError> {
        let plan = BatchPlan::new(&config, Local::now(), Uuid::new_v4())?;
        self.run_plan(config, plan).await
    }

    /// Run a previously laid-out batch.
    ///
    /// Job failures are recorded in the summary; only setup problems are
    /// returned as errors.
    pub async fn run_plan(&self, config: PipelineConfig, plan: BatchPlan) -> Result<BatchSummary, SchedulerError> {
        let extractor = ArtifactExtractor::from_config(&config.document)?;
        let run_dir = plan.run_dir().to_owned();
        let run_dir_error = |source: io::Error| SchedulerError::RunDir {
            path: run_dir.clone(),
            source,
        };
        plan.naming.ensure_run_dir().map_err(run_dir_error)?;
        let run_log = RunLog::open(&run_dir).map_err(run_dir_error)?;
        if let Err(e) = run_log.batch_started(&config, plan.naming.run_uuid()) {
            tracing::warn!(error = %e, "could not append to run log");
        }

        tracing::info!(
            run_dir = %run_dir,
            jobs = plan.jobs.len(),
            parallelism = plan.parallelism,
            "starting batch"
        );

        let ctx = Arc::new(JobContext {
            correction: CorrectionLoop::new(config.correction_instruction()),
            config: Arc::new(config),
            generator: Arc::clone(&self.generator),
            diagnostics: self.diagnostics.clone(),
            extractor,
            run_log,
            run_dir: run_dir.clone(),
            console: self.console,
        });

        let mut reports = Vec::with_capacity(plan.jobs.len());
        for model in &plan.models {
            let jobs: Vec<RunJob> = plan
                .jobs
                .iter()
                .filter(|job| &job.model == model)
                .cloned()
                .collect();
            tracing::info!(model = %model, jobs = jobs.len(), "dispatching model");
            reports.extend(dispatch(jobs, plan.parallelism, &ctx).await?);
        }

        let summary = BatchSummary {
            run_dir,
            run_uuid: plan.naming.run_uuid(),
            jobs: reports,
        };
        if let Err(e) = ctx.run_log.batch_finished(summary.completed(), summary.empty_artifacts(), summary.failed()) {
            tracing::warn!(error = %e, "could not append to run log");
        }
        tracing::info!(
            completed = summary.completed(),
            empty = summary.empty_artifacts(),
            failed = summary.failed(),
            "batch finished"
        );
        Ok(summary)
    }
}

/// Run one model's jobs with at most `parallelism` in flight.
async fn dispatch(
    jobs: Vec<RunJob>,
    parallelism: usize,
    ctx: &Arc<JobContext>,
) -> Result<Vec<JobReport>, SchedulerError> {
    let semaphore = Arc::new(Semaphore::new(parallelism));
    let mut in_flight = JoinSet::new();
    let mut reports = Vec::with_capacity(jobs.len());

    for job in jobs {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SchedulerError::Dispatch)?;
        let ctx = Arc::clone(ctx);
        in_flight.spawn_blocking(move || {
            let _permit = permit;
            run_isolated(&job, &ctx)
        });

        // Collect anything already finished so reports do not pile up.
        while let Some(joined) = in_flight.try_join_next() {
            collect(joined, &mut reports);
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        collect(joined, &mut reports);
    }

    reports.sort_by_key(|r| r.index);
    Ok(reports)
}

fn collect(joined: Result<JobReport, tokio::task::JoinError>, reports: &mut Vec<JobReport>) {
    match joined {
        Ok(report) => reports.push(report),
        Err(e) => tracing::error!(error = %e, "job worker ended without a report"),
    }
}

/// A panicking job becomes a failed report instead of taking the batch down.
fn run_isolated(job: &RunJob, ctx: &JobContext) -> JobReport {
    let started = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| job.execute(ctx))) {
        Ok(report) => report,
        Err(payload) => {
            let error = format!("job panicked: {}", panic_message(payload.as_ref()));
            tracing::error!(model = %job.model, index = job.index, %error, "job aborted");
            if let Err(e) = ctx.run_log.job_failed(&job.model, job.index, &job.final_path, None, &error) {
                tracing::warn!(error = %e, "could not append to run log");
            }
            job.report(JobStatus::Failed { stage: None, error }, None, started)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
