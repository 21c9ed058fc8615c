//! Foundation utilities shared by every boidfactory crate.
//!
//! - [`error`]: the user-facing error taxonomy and [`error::UserFriendlyError`]
//! - [`exit_codes`]: process exit codes and the error to exit code mapping
//! - [`logging`]: tracing subscriber initialisation
//! - [`atomic_write`]: temp file + rename writes for finished artifacts

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;

pub use error::{BoidfactoryError, ConfigError, ErrorCategory, UserFriendlyError};
pub use exit_codes::ExitCode;
