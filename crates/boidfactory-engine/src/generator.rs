//! The external text-generation collaborator.
//!
//! [`Generator`] is the seam the chain and tests plug into. [`CliGenerator`]
//! drives a local command-line tool (by default `ollama run`) through a
//! [`ProcessRunner`], streaming stdout into the caller's sink while also
//! capturing it.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use boidfactory_config::GeneratorConfig;
use boidfactory_runner::{CommandSpec, NativeRunner, ProcessRunner, RunnerError};
use thiserror::Error;

/// How much stderr is kept in error messages.
const STDERR_TAIL_CHARS: usize = 2048;

/// Timeout for listing installed models.
const LIST_TIMEOUT: Duration = Duration::from_secs(60);

/// One generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub instruction: &'a str,
    /// Sent on stdin when present.
    pub input: Option<&'a str>,
    pub thinking: bool,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generator program '{program}' was not found: {reason}")]
    NotFound { program: String, reason: String },

    #[error("failed to start generator: {0}")]
    Spawn(String),

    #[error("generator exited with {}: {stderr}", describe_exit(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("generator timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("generator returned an empty response")]
    EmptyResponse,

    #[error("could not write generator output: {0}")]
    Sink(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl From<RunnerError> for GeneratorError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Timeout { timeout_seconds } => Self::Timeout { timeout_seconds },
            RunnerError::SinkFailed { reason } => Self::Sink(reason),
            RunnerError::SpawnFailed { .. } | RunnerError::Io { .. } => Self::Spawn(err.to_string()),
        }
    }
}

/// Produces text for an instruction, streaming it into `sink` as it arrives.
///
/// Implementations must be callable from several worker threads at once.
pub trait Generator: Send + Sync {
    /// Run one generation and return the complete output.
    ///
    /// A non-zero exit, a timeout, and empty output are all errors.
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        sink: &mut dyn Write,
    ) -> Result<String, GeneratorError>;
}

/// Generator backed by a command-line tool.
#[derive(Debug, Clone)]
pub struct CliGenerator<R = NativeRunner> {
    settings: GeneratorConfig,
    runner: R,
}

impl CliGenerator<NativeRunner> {
    #[must_use]
    pub fn new(settings: GeneratorConfig) -> Self {
        Self::with_runner(settings, NativeRunner)
    }
}

impl<R: ProcessRunner> CliGenerator<R> {
    #[must_use]
    pub fn with_runner(settings: GeneratorConfig, runner: R) -> Self {
        Self { settings, runner }
    }

    #[must_use]
    pub fn settings(&self) -> &GeneratorConfig {
        &self.settings
    }

    /// Resolve the configured program on `PATH` (or as a path).
    pub fn locate(&self) -> Result<PathBuf, GeneratorError> {
        which::which(&self.settings.program).map_err(|e| GeneratorError::NotFound {
            program: self.settings.program.clone(),
            reason: e.to_string(),
        })
    }

    /// The argv for one request:
    /// `<program> <run_args..> <thinking flag..> <model> <instruction>`.
    #[must_use]
    pub fn command_for(&self, request: &GenerationRequest<'_>) -> CommandSpec {
        let thinking = if request.thinking {
            &self.settings.thinking_args
        } else {
            &self.settings.hide_thinking_args
        };
        let mut cmd = CommandSpec::new(&self.settings.program)
            .args(&self.settings.run_args)
            .args(thinking)
            .arg(request.model)
            .arg(request.instruction);
        if let Some(input) = request.input {
            cmd = cmd.stdin(input.as_bytes().to_vec());
        }
        cmd
    }

    /// Raw output of the tool's model listing command.
    pub fn list_models(&self) -> Result<String, GeneratorError> {
        let cmd = CommandSpec::new(&self.settings.program).args(&self.settings.list_args);
        tracing::debug!(command = %cmd.display(), "listing models");
        let output = self.runner.run(&cmd, LIST_TIMEOUT)?;
        if !output.success() {
            return Err(GeneratorError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr_tail(STDERR_TAIL_CHARS),
            });
        }
        Ok(output.stdout_string())
    }
}

impl<R: ProcessRunner> Generator for CliGenerator<R> {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        sink: &mut dyn Write,
    ) -> Result<String, GeneratorError> {
        let cmd = self.command_for(request);
        tracing::debug!(model = request.model, command = %cmd.display(), "invoking generator");

        let output = self.runner.run_streaming(&cmd, request.timeout, sink)?;
        if !output.success() {
            return Err(GeneratorError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr_tail(STDERR_TAIL_CHARS),
            });
        }

        let text = output.stdout_string();
        if text.trim().is_empty() {
            return Err(GeneratorError::EmptyResponse);
        }
        Ok(text)
    }
}
