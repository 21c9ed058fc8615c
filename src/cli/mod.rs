//! Command-line interface for boidfactory
//!
//! ## Module Structure
//!
//! - `args`: clap argument definitions
//! - `run`: entry point, config discovery, runtime creation and error output
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, RunArgs};
pub use run::run;
