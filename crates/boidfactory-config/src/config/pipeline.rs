use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use boidfactory_utils::ConfigError;

use super::{Config, CorrectionConfig, DocumentConfig, GeneratorConfig, StageConfig};

/// Built-in stage chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePreset {
    /// prompt → spec → implementation
    #[default]
    Spec,
    /// prompt → implementation
    Direct,
}

const SPEC_INSTRUCTION: &str = "\
You are writing a design specification for a single-file interactive web page.

Request:
{{prompt}}

Write a concise markdown specification covering behaviour, tunable parameters, \
visual style and controls. Output only the specification.";

const IMPLEMENT_FROM_SPEC_INSTRUCTION: &str = "\
Implement the specification provided on standard input as one self-contained HTML \
file with inline CSS and vanilla JavaScript and no external libraries.

Original request:
{{prompt}}

Return the complete document, starting with <!DOCTYPE html> and ending with </html>.";

const IMPLEMENT_DIRECT_INSTRUCTION: &str = "\
Build the following as one self-contained HTML file with inline CSS and vanilla \
JavaScript and no external libraries.

{{prompt}}

Return the complete document, starting with <!DOCTYPE html> and ending with </html>.";

/// Default instruction for the single corrective pass. The artifact arrives on stdin.
pub const DEFAULT_CORRECTION_INSTRUCTION: &str = "\
The HTML document provided on standard input has these static-analysis diagnostics:

{{diagnostics}}

Fix every diagnostic without changing the page's behaviour. Return the complete \
corrected document, starting with <!DOCTYPE html> and ending with </html>.";

impl PipelinePreset {
    #[must_use]
    pub fn stages(self) -> Vec<StageConfig> {
        match self {
            Self::Spec => vec![
                StageConfig::new("spec", SPEC_INSTRUCTION, "md"),
                StageConfig::new("implementation", IMPLEMENT_FROM_SPEC_INSTRUCTION, "html"),
            ],
            Self::Direct => vec![StageConfig::new(
                "implementation",
                IMPLEMENT_DIRECT_INSTRUCTION,
                "html",
            )],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for PipelinePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelinePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spec" => Ok(Self::Spec),
            "direct" => Ok(Self::Direct),
            other => Err(format!("unknown pipeline '{other}' (expected 'spec' or 'direct')")),
        }
    }
}

/// Where the run directory goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocation {
    /// A fresh `boids-<timestamp>` directory is created under this root.
    Root(Utf8PathBuf),
    /// Use exactly this directory.
    Exact(Utf8PathBuf),
}

impl OutputLocation {
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Root(p) | Self::Exact(p) => p,
        }
    }
}

/// Immutable, validated inputs for one batch. Shared read-only by every job.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub prompt: String,
    pub model_ids: Vec<String>,
    pub times: u32,
    /// Always within `1..=times`.
    pub parallelism: u32,
    pub thinking_enabled: bool,
    pub correction_enabled: bool,
    pub output: OutputLocation,
    /// Never empty.
    pub stages: Vec<StageConfig>,
    pub generator: GeneratorConfig,
    pub correction: CorrectionConfig,
    pub document: DocumentConfig,
}

impl PipelineConfig {
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.stage_timeout_secs)
    }

    #[must_use]
    pub fn correction_timeout(&self) -> Duration {
        Duration::from_secs(self.correction.timeout_secs)
    }

    #[must_use]
    pub fn correction_instruction(&self) -> &str {
        self.correction
            .instruction
            .as_deref()
            .unwrap_or(DEFAULT_CORRECTION_INSTRUCTION)
    }
}

impl Config {
    /// Validate and freeze this configuration for a batch driven by `prompt`.
    ///
    /// `parallelism > times` is clamped to `times`.
    pub fn pipeline(&self, prompt: impl Into<String>) -> Result<PipelineConfig, ConfigError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ConfigError::MissingRequired("prompt".to_string()));
        }
        self.validate()?;

        let stages = if self.stages.is_empty() {
            self.run.pipeline.stages()
        } else {
            self.stages.clone()
        };

        let parallelism = if self.run.parallelism > self.run.times {
            tracing::info!(
                requested = self.run.parallelism,
                times = self.run.times,
                "parallelism exceeds run count; clamping"
            );
            self.run.times
        } else {
            self.run.parallelism
        };

        let output = match &self.run.out_dir {
            Some(dir) => OutputLocation::Exact(utf8(dir, "out_dir")?),
            None => OutputLocation::Root(utf8(&self.run.output_root, "output_dir")?),
        };

        Ok(PipelineConfig {
            prompt,
            model_ids: self.run.models.clone(),
            times: self.run.times,
            parallelism,
            thinking_enabled: self.run.thinking,
            correction_enabled: self.run.correction,
            output,
            stages,
            generator: self.generator.clone(),
            correction: self.correction.clone(),
            document: self.document.clone(),
        })
    }
}

fn utf8(path: &std::path::Path, key: &str) -> Result<Utf8PathBuf, ConfigError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|p| ConfigError::InvalidValue {
        key: key.to_string(),
        value: format!("path is not valid UTF-8: {}", p.display()),
    })
}
