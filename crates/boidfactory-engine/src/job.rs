//! One `(model, run index)` execution of the stage chain.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use boidfactory_config::PipelineConfig;
use boidfactory_lock::ConsoleLock;
use boidfactory_utils::atomic_write::write_file_atomic;
use camino::{Utf8Path, Utf8PathBuf};

use crate::chain::{ChainContext, StageChain, StageSinks};
use crate::correction::{CorrectionLoop, DiagnosticsSource};
use crate::extract::ArtifactExtractor;
use crate::generator::Generator;
use crate::naming::NamingAuthority;
use crate::run_log::RunLog;
use crate::stage::Stage;
use crate::summary::{JobReport, JobStatus};

/// Where the console holder's live stream goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Console {
    #[default]
    Stdout,
    /// Arbitrate as usual but print nothing. Used by tests and `--quiet`.
    Silent,
}

/// Read-only state shared by every job in a batch.
pub struct JobContext {
    pub config: Arc<PipelineConfig>,
    pub generator: Arc<dyn Generator>,
    pub diagnostics: Option<Arc<dyn DiagnosticsSource>>,
    pub extractor: ArtifactExtractor,
    pub correction: CorrectionLoop,
    pub run_log: RunLog,
    pub run_dir: Utf8PathBuf,
    pub console: Console,
}

/// A planned job. Paths are fixed before anything runs.
#[derive(Debug, Clone)]
pub struct RunJob {
    pub index: u32,
    pub model: String,
    pub chain: Arc<StageChain>,
    /// Output path for every stage, by stage name.
    pub output_paths: BTreeMap<String, Utf8PathBuf>,
    pub final_path: Utf8PathBuf,
    /// Where a corrected artifact goes, when correction is enabled.
    pub corrected_path: Option<Utf8PathBuf>,
}

impl RunJob {
    #[must_use]
    pub fn plan(
        index: u32,
        model: &str,
        chain: Arc<StageChain>,
        naming: &NamingAuthority,
        correction_enabled: bool,
    ) -> Self {
        let output_paths: BTreeMap<String, Utf8PathBuf> = chain
            .stages()
            .iter()
            .map(|stage| {
                (
                    stage.name().to_string(),
                    naming.name_for(model, index, stage.name(), stage.extension()),
                )
            })
            .collect();
        let last = chain.final_stage();
        let final_path = naming.name_for(model, index, last.name(), last.extension());
        let corrected_path = correction_enabled
            .then(|| naming.corrected_name_for(model, index, last.name(), last.extension()));

        Self {
            index,
            model: model.to_string(),
            chain,
            output_paths,
            final_path,
            corrected_path,
        }
    }

    /// Run the chain, write artifacts, and report. Never panics on job
    /// failure; every outcome becomes a [`JobStatus`].
    pub fn execute(&self, ctx: &JobContext) -> JobReport {
        let started = Instant::now();
        let span = tracing::info_span!("job", model = %self.model, index = self.index);
        let _entered = span.enter();

        let mut lock = match ConsoleLock::open(&ctx.run_dir) {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!(error = %e, "console lock unavailable; output will not be streamed");
                None
            }
        };
        let guard = match lock.as_mut().map(|l| l.try_acquire(self.index, &self.model)) {
            Some(Ok(guard)) => guard,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "console lock check failed");
                None
            }
            None => None,
        };
        if let Some(guard) = &guard {
            tracing::debug!("holding console");
            note(ctx.run_log.console_acquired(guard.holder()));
        }
        let live = guard.is_some() && ctx.console == Console::Stdout;

        let (status, corrected_path) = self.run(ctx, live);
        drop(guard);

        match &status {
            JobStatus::Completed => {
                tracing::info!(artifact = %self.final_path, "job completed");
                note(ctx.run_log.job_completed(&self.model, self.index, &self.final_path));
            }
            JobStatus::EmptyArtifact => {
                tracing::warn!(artifact = %self.final_path, "final output contained no document; wrote empty artifact");
                note(ctx.run_log.job_empty_artifact(&self.model, self.index, &self.final_path));
            }
            JobStatus::Failed { stage, error } => {
                tracing::warn!(stage = stage.as_deref().unwrap_or("-"), %error, "job failed");
                note(ctx.run_log.job_failed(
                    &self.model,
                    self.index,
                    &self.final_path,
                    stage.as_deref(),
                    error,
                ));
            }
        }

        self.report(status, corrected_path, started)
    }

    pub(crate) fn report(
        &self,
        status: JobStatus,
        corrected_path: Option<Utf8PathBuf>,
        started: Instant,
    ) -> JobReport {
        JobReport {
            model: self.model.clone(),
            index: self.index,
            status,
            stage_paths: self.output_paths.clone(),
            final_path: self.final_path.clone(),
            corrected_path,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn run(&self, ctx: &JobContext, live: bool) -> (JobStatus, Option<Utf8PathBuf>) {
        let chain_ctx = ChainContext {
            prompt: &ctx.config.prompt,
            model: &self.model,
            thinking: ctx.config.thinking_enabled,
            stage_timeout: ctx.config.stage_timeout(),
        };
        let mut sinks = JobSinks { job: self, live };

        let output = match self
            .chain
            .execute(ctx.generator.as_ref(), &chain_ctx, None, &mut sinks)
        {
            Ok(output) => output,
            Err(err) => {
                let status = JobStatus::Failed {
                    stage: err.stage().map(str::to_string),
                    error: err.to_string(),
                };
                return (status, None);
            }
        };

        let document = ctx.extractor.extract(output.final_text());
        if let Err(e) = write_file_atomic(&self.final_path, document) {
            let status = JobStatus::Failed {
                stage: Some(self.chain.final_stage().name().to_string()),
                error: format!("could not write artifact: {e:#}"),
            };
            return (status, None);
        }
        if document.is_empty() {
            return (JobStatus::EmptyArtifact, None);
        }

        let corrected = if ctx.config.correction_enabled {
            self.correct(ctx, &chain_ctx, document, live)
        } else {
            None
        };
        (JobStatus::Completed, corrected)
    }

    /// One corrective pass. Any problem here leaves the original artifact in
    /// place and only skips the corrected copy.
    fn correct(
        &self,
        ctx: &JobContext,
        chain_ctx: &ChainContext<'_>,
        document: &str,
        live: bool,
    ) -> Option<Utf8PathBuf> {
        let (Some(source), Some(target)) = (ctx.diagnostics.as_ref(), self.corrected_path.as_ref())
        else {
            return None;
        };

        let diagnostics = match source.diagnose(&self.final_path) {
            Ok(diagnostics) => diagnostics,
            Err(e) => {
                tracing::warn!(error = %e, "skipping correction");
                note(ctx.run_log.correction_skipped(&self.model, self.index, &e.to_string()));
                return None;
            }
        };
        if diagnostics.trim().is_empty() {
            tracing::debug!("no diagnostics; artifact is clean");
            note(ctx.run_log.correction_skipped(&self.model, self.index, "no diagnostics"));
            return None;
        }

        let result = open_sink(target, live, &format!("{} #{:02} fix", self.model, self.index))
            .map_err(|e| e.to_string())
            .and_then(|mut sink| {
                ctx.correction
                    .correct(
                        ctx.generator.as_ref(),
                        chain_ctx,
                        &ctx.extractor,
                        document,
                        &diagnostics,
                        &mut sink,
                    )
                    .map_err(|e| e.to_string())
            })
            .and_then(|fixed| write_file_atomic(target, &fixed).map_err(|e| format!("{e:#}")));

        match result {
            Ok(()) => {
                tracing::info!(artifact = %target, "corrected artifact written");
                note(ctx.run_log.correction_written(&self.model, self.index, target));
                Some(target.clone())
            }
            Err(reason) => {
                let _ = fs::remove_file(target);
                tracing::warn!(error = %reason, "correction failed; keeping original artifact");
                note(ctx.run_log.correction_failed(&self.model, self.index, &reason));
                None
            }
        }
    }
}

struct JobSinks<'a> {
    job: &'a RunJob,
    live: bool,
}

impl StageSinks for JobSinks<'_> {
    fn sink_for(&mut self, _index: usize, stage: &Stage) -> io::Result<Box<dyn Write>> {
        let path = self.job.output_paths.get(stage.name()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no output path planned for stage '{}'", stage.name()),
            )
        })?;
        let banner = format!("{} #{:02} {}", self.job.model, self.job.index, stage.name());
        open_sink(path, self.live, &banner)
    }
}

fn open_sink(path: &Utf8Path, live: bool, banner: &str) -> io::Result<Box<dyn Write>> {
    let file = File::create(path)?;
    if !live {
        return Ok(Box::new(file));
    }
    let mut console = io::stdout();
    let _ = writeln!(console, "\n==> {banner}");
    Ok(Box::new(Tee {
        file,
        console: Some(console),
    }))
}

/// Writes to the artifact file and, best effort, to the console.
struct Tee {
    file: File,
    console: Option<io::Stdout>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if let Some(console) = self.console.as_mut()
            && console.write_all(buf).and_then(|()| console.flush()).is_err()
        {
            self.console = None;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Run-log write failures never fail a job.
fn note(result: io::Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "could not append to run log");
    }
}
