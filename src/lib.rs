//! boidfactory - fan a generation pipeline out across models and repetitions
//!
//! boidfactory takes one operator prompt, pushes it through a chain of
//! generation stages (by default *spec* then *implementation*) using a local
//! command-line generator, and repeats the chain `times` times for each
//! model with at most `parallelism` jobs in flight. Every stage output lands
//! in a uniquely named file; the final output is reduced to the embedded
//! HTML document, and an optional single corrective pass feeds linter
//! diagnostics back to the generator.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! boidfactory run --prompt "a flock of boids with sliders" -m qwen3:8b -n 4 -p 2
//! boidfactory plan --prompt "boids" --random-models 3 --seed 7
//! boidfactory models
//! ```
//!
//! # Library use
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use boidfactory::{CliGenerator, Config, JobScheduler};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().models(["qwen3:8b"]).times(4).parallelism(2).build()?;
//! let pipeline = config.pipeline("a flock of boids")?;
//! let generator = Arc::new(CliGenerator::new(pipeline.generator.clone()));
//! let summary = JobScheduler::new(generator).run(pipeline).await?;
//! println!("{} completed", summary.completed());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod prompt;

pub use boidfactory_config::{
    CliArgs, Config, ConfigBuilder, ConfigSource, OutputLocation, PipelineConfig, PipelinePreset,
    StageConfig,
};
pub use boidfactory_engine::{
    ArtifactExtractor, BatchPlan, BatchSummary, CliGenerator, CommandDiagnostics, Console,
    CorrectionLoop, DiagnosticsSource, GenerationRequest, Generator, GeneratorError, JobReport,
    JobScheduler, JobStatus, ModelCatalog, NamingAuthority, Stage, StageChain,
};
pub use boidfactory_utils::{BoidfactoryError, ConfigError, ExitCode, UserFriendlyError};
