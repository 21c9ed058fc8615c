//! CLI argument definitions (clap derive).

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use boidfactory_config::{CliArgs, PipelinePreset};

/// boidfactory - run a prompt through local models many times at once
#[derive(Parser, Debug)]
#[command(name = "boidfactory")]
#[command(about = "Fan a generation pipeline out across models and repetitions")]
#[command(long_about = r#"
boidfactory drives a local text-generation CLI (ollama by default) through a
chain of stages (spec -> implementation by default), repeats the chain N times
per model with at most P jobs in flight, and writes every stage's output to a
uniquely named file in a run directory.

EXAMPLES:
  # Four runs of one model, two at a time
  boidfactory run --prompt "a flock of boids" -m qwen3:8b -n 4 -p 2

  # Three random installed models, reproducibly
  boidfactory run --prompt-file idea.md --random-models 3 --seed 7

  # Show planned paths and effective configuration without running anything
  boidfactory plan --prompt "boids" -m gemma3:12b -n 2

  # List models eligible for generation
  boidfactory models

CONFIGURATION:
  Precedence: CLI flags > BOIDFACTORY_* environment > config file > defaults
  The config file is discovered by searching upward from the current
  directory for .boidfactory/config.toml; --config names one explicitly.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Generator program (overrides config and BOIDFACTORY_GENERATOR)
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub generator: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the batch
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Print the batch summary as JSON
        #[arg(long)]
        json: bool,

        /// Do not stream stage output to the console
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show planned output paths and effective configuration without running
    Plan {
        #[command(flatten)]
        args: RunArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List installed models eligible for generation
    Models {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Batch options shared by `run` and `plan`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Operator prompt text
    #[arg(long, value_name = "TEXT", group = "prompt_source")]
    pub prompt: Option<String>,

    /// Read the operator prompt from a file
    #[arg(long, value_name = "PATH", group = "prompt_source")]
    pub prompt_file: Option<PathBuf>,

    /// Write the operator prompt in $VISUAL / $EDITOR
    #[arg(long, group = "prompt_source")]
    pub edit: bool,

    /// Model to run (repeatable or comma-separated)
    #[arg(short, long = "model", value_name = "MODEL", value_delimiter = ',', action = ArgAction::Append)]
    pub models: Vec<String>,

    /// Pick this many random installed models instead of --model
    #[arg(long, value_name = "K", conflicts_with = "models")]
    pub random_models: Option<usize>,

    /// Seed for --random-models
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Runs per model
    #[arg(short = 'n', long, value_name = "N")]
    pub times: Option<u32>,

    /// Maximum jobs in flight
    #[arg(short = 'p', long = "parallel", value_name = "P")]
    pub parallelism: Option<u32>,

    /// Enable generator thinking output
    #[arg(long, overrides_with = "no_thinking")]
    pub thinking: bool,

    /// Hide generator thinking output
    #[arg(long, overrides_with = "thinking")]
    pub no_thinking: bool,

    /// Run one corrective pass driven by lint diagnostics
    #[arg(long, overrides_with = "no_correct")]
    pub correct: bool,

    /// Skip the corrective pass
    #[arg(long, overrides_with = "correct")]
    pub no_correct: bool,

    /// Built-in stage chain
    #[arg(long, value_name = "NAME")]
    pub pipeline: Option<PipelinePreset>,

    /// Parent directory for timestamped run directories
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Exact run directory (no timestamped subdirectory)
    #[arg(long, value_name = "DIR", conflicts_with = "output_dir")]
    pub out_dir: Option<PathBuf>,

    /// Per-stage generator timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub stage_timeout: Option<u64>,
}

fn tri_state(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

impl RunArgs {
    /// Configuration overrides carried by these flags.
    #[must_use]
    pub fn to_cli_args(&self, config_path: Option<PathBuf>, generator: Option<String>) -> CliArgs {
        CliArgs {
            config_path,
            models: self.models.clone(),
            times: self.times,
            parallelism: self.parallelism,
            thinking: tri_state(self.thinking, self.no_thinking),
            correction: tri_state(self.correct, self.no_correct),
            output_root: self.output_dir.clone(),
            out_dir: self.out_dir.clone(),
            pipeline: self.pipeline,
            seed: self.seed,
            stage_timeout_secs: self.stage_timeout,
            generator_program: generator,
        }
    }
}
