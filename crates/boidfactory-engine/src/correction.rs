//! Single-pass correction driven by static-analysis diagnostics.
//!
//! A [`DiagnosticsSource`] inspects a finished artifact. When it reports
//! anything, the [`CorrectionLoop`] sends the artifact and the diagnostics
//! back to the generator once. The original artifact is never modified;
//! the caller writes the corrected document next to it.

use std::io::Write;
use std::time::Duration;

use boidfactory_config::PipelineConfig;
use boidfactory_runner::{CommandSpec, NativeRunner, ProcessRunner};
use camino::Utf8Path;
use thiserror::Error;

use crate::chain::ChainContext;
use crate::extract::ArtifactExtractor;
use crate::generator::{GenerationRequest, Generator, GeneratorError};
use crate::template::{self, TemplateVars};

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("diagnostics command failed: {0}")]
    Diagnostics(String),

    #[error("corrective generation failed: {0}")]
    Generation(#[from] GeneratorError),

    #[error("corrective output contained no document")]
    NoDocument,
}

/// Produces diagnostics for an artifact on disk.
pub trait DiagnosticsSource: Send + Sync {
    /// Empty output means the artifact is clean.
    fn diagnose(&self, artifact: &Utf8Path) -> Result<String, CorrectionError>;
}

/// Runs an external linter: `<program> <args..> <artifact>`.
///
/// Linters exit non-zero when they find problems, so the exit code is
/// ignored and stdout and stderr together are the diagnostics.
#[derive(Debug, Clone)]
pub struct CommandDiagnostics<R = NativeRunner> {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    runner: R,
}

impl CommandDiagnostics<NativeRunner> {
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::with_runner(
            config.correction.program.clone(),
            config.correction.args.clone(),
            config.correction_timeout(),
            NativeRunner,
        )
    }
}

impl<R: ProcessRunner> CommandDiagnostics<R> {
    #[must_use]
    pub fn with_runner(program: String, args: Vec<String>, timeout: Duration, runner: R) -> Self {
        Self {
            program,
            args,
            timeout,
            runner,
        }
    }

    /// Resolve the linter on `PATH`.
    pub fn locate(&self) -> Result<std::path::PathBuf, CorrectionError> {
        which::which(&self.program)
            .map_err(|e| CorrectionError::Diagnostics(format!("'{}' not found: {e}", self.program)))
    }
}

impl<R: ProcessRunner> DiagnosticsSource for CommandDiagnostics<R> {
    fn diagnose(&self, artifact: &Utf8Path) -> Result<String, CorrectionError> {
        let cmd = CommandSpec::new(&self.program)
            .args(&self.args)
            .arg(artifact.as_str());
        tracing::debug!(command = %cmd.display(), "collecting diagnostics");

        let output = self
            .runner
            .run(&cmd, self.timeout)
            .map_err(|e| CorrectionError::Diagnostics(e.to_string()))?;

        let mut diagnostics = output.stdout_string().trim().to_string();
        let stderr = output.stderr_string();
        if !stderr.trim().is_empty() {
            if !diagnostics.is_empty() {
                diagnostics.push('\n');
            }
            diagnostics.push_str(stderr.trim());
        }
        Ok(diagnostics)
    }
}

/// The one corrective generation pass.
#[derive(Debug, Clone)]
pub struct CorrectionLoop {
    instruction_template: String,
}

impl CorrectionLoop {
    /// `instruction_template` should reference `{{diagnostics}}`. The
    /// artifact is inlined if it references `{{input}}` and piped on stdin
    /// otherwise.
    #[must_use]
    pub fn new(instruction_template: impl Into<String>) -> Self {
        Self {
            instruction_template: instruction_template.into(),
        }
    }

    /// Ask the generator to fix `artifact` given `diagnostics`, streaming
    /// the raw response into `sink`. Returns the extracted document.
    pub fn correct(
        &self,
        generator: &dyn Generator,
        ctx: &ChainContext<'_>,
        extractor: &ArtifactExtractor,
        artifact: &str,
        diagnostics: &str,
        sink: &mut dyn Write,
    ) -> Result<String, CorrectionError> {
        let inline = template::references_input(&self.instruction_template);
        let instruction = template::render(
            &self.instruction_template,
            &TemplateVars::new(ctx.prompt)
                .with_input(inline.then_some(artifact))
                .with_diagnostics(diagnostics),
        );
        let request = GenerationRequest {
            model: ctx.model,
            instruction: &instruction,
            input: (!inline).then_some(artifact),
            thinking: ctx.thinking,
            timeout: ctx.stage_timeout,
        };

        let raw = generator.generate(&request, sink)?;
        let document = extractor.extract(&raw);
        if document.is_empty() {
            return Err(CorrectionError::NoDocument);
        }
        Ok(document.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boidfactory_config::DocumentConfig;
    use boidfactory_runner::{ProcessOutput, RunnerError};
    use std::sync::Mutex;

    struct FixingGenerator {
        seen: Mutex<Option<(String, Option<String>)>>,
        reply: &'static str,
    }

    impl Generator for FixingGenerator {
        fn generate(
            &self,
            request: &GenerationRequest<'_>,
            _sink: &mut dyn Write,
        ) -> Result<String, GeneratorError> {
            *self.seen.lock().unwrap() = Some((
                request.instruction.to_string(),
                request.input.map(str::to_string),
            ));
            Ok(self.reply.to_string())
        }
    }

    fn ctx() -> ChainContext<'static> {
        ChainContext {
            prompt: "boids",
            model: "m",
            thinking: false,
            stage_timeout: Duration::from_secs(5),
        }
    }

    fn extractor() -> ArtifactExtractor {
        ArtifactExtractor::from_config(&DocumentConfig::default()).unwrap()
    }

    #[test]
    fn diagnostics_reach_instruction_and_artifact_goes_on_stdin() {
        let generator = FixingGenerator {
            seen: Mutex::new(None),
            reply: "sure!\n<!DOCTYPE html><p>fixed</p></html>\ndone",
        };
        let fixed = CorrectionLoop::new("Fix:\n{{diagnostics}}")
            .correct(&generator, &ctx(), &extractor(), "<!DOCTYPE html>old</html>", "L1 bad tag", &mut Vec::new())
            .unwrap();
        assert_eq!(fixed, "<!DOCTYPE html><p>fixed</p></html>");

        let (instruction, input) = generator.seen.lock().unwrap().clone().unwrap();
        assert_eq!(instruction, "Fix:\nL1 bad tag");
        assert_eq!(input.as_deref(), Some("<!DOCTYPE html>old</html>"));
    }

    #[test]
    fn inlined_artifact_is_not_piped() {
        let generator = FixingGenerator {
            seen: Mutex::new(None),
            reply: "<!DOCTYPE html>ok</html>",
        };
        CorrectionLoop::new("{{diagnostics}} in {{input}}")
            .correct(&generator, &ctx(), &extractor(), "DOC", "D", &mut Vec::new())
            .unwrap();
        let (instruction, input) = generator.seen.lock().unwrap().clone().unwrap();
        assert_eq!(instruction, "D in DOC");
        assert_eq!(input, None);
    }

    #[test]
    fn reply_without_document_is_an_error() {
        let generator = FixingGenerator {
            seen: Mutex::new(None),
            reply: "I fixed it (trust me)",
        };
        let err = CorrectionLoop::new("{{diagnostics}}")
            .correct(&generator, &ctx(), &extractor(), "DOC", "D", &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, CorrectionError::NoDocument));
    }

    struct LintRunner;

    impl ProcessRunner for LintRunner {
        fn run_streaming(
            &self,
            cmd: &CommandSpec,
            _timeout: Duration,
            _sink: &mut dyn Write,
        ) -> Result<ProcessOutput, RunnerError> {
            let target = cmd.args.last().unwrap().to_string_lossy().into_owned();
            Ok(ProcessOutput::new(
                format!("{target}:3 tag-pair\n").into_bytes(),
                b"1 error\n".to_vec(),
                Some(1),
            ))
        }
    }

    #[test]
    fn command_diagnostics_ignore_exit_code_and_merge_streams() {
        let source = CommandDiagnostics::with_runner(
            "htmlhint".to_string(),
            vec!["--format".to_string(), "unix".to_string()],
            Duration::from_secs(5),
            LintRunner,
        );
        let diagnostics = source.diagnose(Utf8Path::new("out/a.html")).unwrap();
        assert_eq!(diagnostics, "out/a.html:3 tag-pair\n1 error");
    }
}
