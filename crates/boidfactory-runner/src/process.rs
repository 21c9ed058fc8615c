use crate::error::RunnerError;
use std::io::{self, Write};
use std::time::Duration;

use super::CommandSpec;

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Everything the process wrote to stdout, also delivered to the sink
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Last `max_chars` characters of stderr, for error messages.
    #[must_use]
    pub fn stderr_tail(&self, max_chars: usize) -> String {
        let stderr = self.stderr_string();
        let trimmed = stderr.trim_end();
        let count = trimmed.chars().count();
        if count <= max_chars {
            trimmed.to_string()
        } else {
            trimmed.chars().skip(count - max_chars).collect()
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string
/// evaluation). The interface is synchronous; callers that need concurrency
/// run it on blocking worker threads.
pub trait ProcessRunner: Send + Sync {
    /// Execute `cmd`, copying stdout into `sink` as it arrives.
    ///
    /// Returns `Ok` whenever the process exits before `timeout`, whatever its
    /// exit code. A process still running at the deadline is killed and
    /// reported as [`RunnerError::Timeout`].
    fn run_streaming(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        sink: &mut dyn Write,
    ) -> Result<ProcessOutput, RunnerError>;

    /// Execute `cmd` and only capture its output.
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        self.run_streaming(cmd, timeout, &mut io::sink())
    }
}
