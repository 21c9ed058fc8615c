//! Subprocess execution for generator and lint invocations.
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] so every invocation is
//! argv-style. Model ids, instructions and prompt text reach the child as
//! discrete arguments or on stdin, never through a shell.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
