//! Configuration for boidfactory runs.
//!
//! Precedence: CLI > environment > `.boidfactory/config.toml` > defaults.
//! [`Config::pipeline`] turns the layered configuration into the immutable
//! [`PipelineConfig`] every job reads from.

mod config;

pub use config::*;
