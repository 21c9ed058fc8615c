//! Command implementations.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use camino::Utf8PathBuf;
use chrono::Local;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use uuid::Uuid;

use boidfactory_config::{CliArgs, Config, ConfigSource, PipelineConfig};
use boidfactory_engine::{
    BatchPlan, BatchSummary, CliGenerator, CommandDiagnostics, Console, JobScheduler, JobStatus, ModelCatalog,
};
use boidfactory_utils::{BoidfactoryError, ConfigError};

use super::args::RunArgs;
use crate::prompt::PromptSource;

/// Options that apply to every subcommand.
#[derive(Debug, Clone, Default)]
pub(crate) struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub generator: Option<String>,
}

pub(crate) async fn execute_run_command(
    args: &RunArgs,
    global: &GlobalOptions,
    json: bool,
    quiet: bool,
) -> Result<(), BoidfactoryError> {
    let prompt = PromptSource::from_args(args)?.read()?;
    let config = resolve_config(args.to_cli_args(global.config_path.clone(), global.generator.clone()), args)?;
    let pipeline = config.pipeline(prompt)?;

    let generator = CliGenerator::new(pipeline.generator.clone());
    let program = generator.locate().map_err(|e| BoidfactoryError::GeneratorUnavailable {
        reason: e.to_string(),
    })?;
    tracing::debug!(program = %program.display(), "generator located");

    let console = if quiet || json {
        Console::Silent
    } else {
        Console::Stdout
    };
    let mut scheduler = JobScheduler::new(Arc::new(generator)).with_console(console);
    if pipeline.correction_enabled {
        // Checked before the run directory exists, like the generator.
        let diagnostics = CommandDiagnostics::from_config(&pipeline);
        let linter = diagnostics.locate().map_err(|e| {
            BoidfactoryError::Config(ConfigError::InvalidValue {
                key: "correction.program".to_string(),
                value: e.to_string(),
            })
        })?;
        tracing::debug!(program = %linter.display(), "linter located");
        scheduler = scheduler.with_diagnostics(Arc::new(diagnostics));
    }

    let summary = scheduler
        .run(pipeline)
        .await
        .map_err(|e| BoidfactoryError::Runtime { reason: e.to_string() })?;

    if json {
        let rendered = serde_json::to_string_pretty(&summary).context("Failed to serialize batch summary")?;
        println!("{rendered}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

pub(crate) fn execute_plan_command(
    args: &RunArgs,
    global: &GlobalOptions,
    json: bool,
) -> Result<(), BoidfactoryError> {
    let prompt = PromptSource::from_args(args)?.read()?;
    let config = resolve_config(args.to_cli_args(global.config_path.clone(), global.generator.clone()), args)?;
    let pipeline = config.pipeline(prompt)?;
    let plan = BatchPlan::new(&pipeline, Local::now(), Uuid::new_v4())
        .map_err(|e| BoidfactoryError::Runtime { reason: e.to_string() })?;
    let effective = config.effective_config();

    if json {
        let rendered = serde_json::to_string_pretty(&PlanOutput::new(&pipeline, &plan, &effective))
            .context("Failed to serialize plan")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Run directory: {}", plan.run_dir());
    println!(
        "Jobs: {} ({} model(s) x {} run(s), {} at a time)",
        plan.jobs.len(),
        plan.models.len(),
        pipeline.times,
        plan.parallelism
    );
    for job in &plan.jobs {
        println!("\n  {} #{:02}", job.model, job.index);
        for stage in job.chain.stages() {
            if let Some(path) = job.output_paths.get(stage.name()) {
                println!("    {:<16} {path}", stage.name());
            }
        }
        if let Some(path) = &job.corrected_path {
            println!("    {:<16} {path}", "corrected");
        }
    }

    println!("\nEffective configuration:");
    for (key, (value, source)) in &effective {
        println!("  {key:<28} {value:<40} [{source}]");
    }
    if let Some(path) = &config.config_path {
        println!("\nConfig file: {}", path.display());
    }
    Ok(())
}

pub(crate) fn execute_models_command(global: &GlobalOptions, json: bool) -> Result<(), BoidfactoryError> {
    let cli_args = CliArgs {
        config_path: global.config_path.clone(),
        generator_program: global.generator.clone(),
        ..CliArgs::default()
    };
    let config = discover(&cli_args)?;
    let catalog = list_catalog(&config)?;

    if json {
        let rendered = serde_json::to_string_pretty(catalog.models()).context("Failed to serialize models")?;
        println!("{rendered}");
    } else {
        for model in catalog.models() {
            println!("{model}");
        }
    }
    Ok(())
}

/// Discover configuration and apply `--random-models`.
fn resolve_config(cli_args: CliArgs, args: &RunArgs) -> Result<Config, BoidfactoryError> {
    let mut config = discover(&cli_args)?;
    if let Some(count) = args.random_models {
        let catalog = list_catalog(&config)?;
        let mut rng = match config.run.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let models = catalog
            .sample(count, &mut rng)
            .map_err(|e| ConfigError::InvalidValue {
                key: "random_models".to_string(),
                value: e.to_string(),
            })?;
        tracing::info!(models = %models.join(","), "sampled random models");
        config.set_models(models, ConfigSource::Cli);
    }
    Ok(config)
}

fn discover(cli_args: &CliArgs) -> Result<Config, BoidfactoryError> {
    Config::discover(cli_args).map_err(|err| match err.downcast::<ConfigError>() {
        Ok(config_error) => BoidfactoryError::Config(config_error),
        Err(other) => BoidfactoryError::Config(ConfigError::DiscoveryFailed {
            reason: format!("{other:#}"),
        }),
    })
}

fn list_catalog(config: &Config) -> Result<ModelCatalog, BoidfactoryError> {
    let generator = CliGenerator::new(config.generator.clone());
    let unavailable = |e: boidfactory_engine::GeneratorError| BoidfactoryError::GeneratorUnavailable {
        reason: e.to_string(),
    };
    generator.locate().map_err(unavailable)?;
    let listing = generator.list_models().map_err(unavailable)?;
    Ok(ModelCatalog::parse_list_output(&listing))
}

fn print_summary(summary: &BatchSummary) {
    print!("{}", render_summary(summary));
}

/// Human summary: every artifact path, then every job that did not complete
/// with the path it was writing to.
fn render_summary(summary: &BatchSummary) -> String {
    let mut out = format!("\nRun directory: {}\n", summary.run_dir);
    let artifacts = summary.artifacts();
    if !artifacts.is_empty() {
        out.push_str("Created:\n");
        for path in artifacts {
            let _ = writeln!(out, "  {path}");
        }
    }
    let problems: Vec<_> = summary
        .jobs
        .iter()
        .filter(|j| !matches!(j.status, JobStatus::Completed))
        .collect();
    if !problems.is_empty() {
        out.push_str("Problems:\n");
        for job in problems {
            match &job.status {
                JobStatus::Failed { stage, error } => {
                    let _ = writeln!(
                        out,
                        "  {} #{:02} failed at {} ({}): {error}",
                        job.model,
                        job.index,
                        stage.as_deref().unwrap_or("startup"),
                        job.final_path
                    );
                }
                JobStatus::EmptyArtifact => {
                    let _ = writeln!(
                        out,
                        "  {} #{:02} produced no document ({})",
                        job.model, job.index, job.final_path
                    );
                }
                JobStatus::Completed => {}
            }
        }
    }
    let _ = writeln!(
        out,
        "{} completed, {} empty, {} failed",
        summary.completed(),
        summary.empty_artifacts(),
        summary.failed()
    );
    out
}

#[derive(Serialize)]
struct PlannedJobOutput<'a> {
    model: &'a str,
    index: u32,
    stage_paths: &'a BTreeMap<String, Utf8PathBuf>,
    final_path: &'a Utf8PathBuf,
    corrected_path: Option<&'a Utf8PathBuf>,
}

#[derive(Serialize)]
struct ConfigEntry<'a> {
    value: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    run_dir: &'a str,
    parallelism: usize,
    stages: Vec<&'a str>,
    jobs: Vec<PlannedJobOutput<'a>>,
    config: BTreeMap<&'a str, ConfigEntry<'a>>,
}

impl<'a> PlanOutput<'a> {
    fn new(
        pipeline: &'a PipelineConfig,
        plan: &'a BatchPlan,
        effective: &'a BTreeMap<String, (String, String)>,
    ) -> Self {
        Self {
            run_dir: plan.run_dir().as_str(),
            parallelism: plan.parallelism,
            stages: pipeline.stages.iter().map(|s| s.name.as_str()).collect(),
            jobs: plan
                .jobs
                .iter()
                .map(|job| PlannedJobOutput {
                    model: &job.model,
                    index: job.index,
                    stage_paths: &job.output_paths,
                    final_path: &job.final_path,
                    corrected_path: job.corrected_path.as_ref(),
                })
                .collect(),
            config: effective
                .iter()
                .map(|(key, (value, source))| (key.as_str(), ConfigEntry { value, source }))
                .collect(),
        }
    }
}
