//! Configuration management for boidfactory
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. Configuration files are TOML with
//! `[generator]`, `[run]`, `[correction]`, `[document]` and `[[stages]]`
//! sections.

mod builder;
mod cli_args;
mod discovery;
mod env;
mod model;
mod pipeline;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use env::{ENV_CORRECTION, ENV_GENERATOR, ENV_THINKING, parse_bool};
pub use model::*;
pub use pipeline::{OutputLocation, PipelineConfig, PipelinePreset};
pub use sources::ConfigSource;
