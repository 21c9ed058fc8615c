//! Error types for process execution

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Process I/O failed: {reason}")]
    Io { reason: String },

    #[error("Output sink rejected process output: {reason}")]
    SinkFailed { reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}
