use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::{ConfigSource, PipelinePreset};

pub const DEFAULT_GENERATOR_PROGRAM: &str = "ollama";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;
pub const MIN_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 7200;
pub const DEFAULT_LINT_PROGRAM: &str = "htmlhint";
pub const DEFAULT_CORRECTION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OUTPUT_ROOT: &str = "runs";
pub const DEFAULT_OPEN_MARKER: &str = "<!DOCTYPE html>";
pub const DEFAULT_CLOSE_MARKER: &str = "</html>";

/// Layered configuration for one boidfactory invocation.
///
/// Use [`Config::discover`] for CLI semantics or [`Config::builder`] for
/// programmatic use. Each value records where it came from in
/// `source_attribution`.
///
/// ```toml
/// [generator]
/// program = "ollama"
/// run_args = ["run"]
/// stage_timeout_secs = 600
///
/// [run]
/// models = ["qwen3:8b", "gemma3:12b"]
/// times = 4
/// parallelism = 2
/// pipeline = "spec"
///
/// [correction]
/// program = "htmlhint"
///
/// [[stages]]
/// name = "implementation"
/// instruction = "Build {{prompt}} as one HTML file."
/// extension = "html"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub run: RunConfig,
    pub correction: CorrectionConfig,
    pub document: DocumentConfig,
    /// Custom stage chain. Empty means the `run.pipeline` preset applies.
    pub stages: Vec<StageConfig>,
    /// Source attribution for each setting (for `plan` output).
    pub source_attribution: HashMap<String, ConfigSource>,
    /// The config file that was loaded, if any.
    pub config_path: Option<PathBuf>,
}

/// How the external generation tool is invoked.
///
/// A stage runs `<program> <run_args..> <thinking flag..> <model> <instruction>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub program: String,
    pub run_args: Vec<String>,
    pub list_args: Vec<String>,
    pub thinking_args: Vec<String>,
    pub hide_thinking_args: Vec<String>,
    pub stage_timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_GENERATOR_PROGRAM.to_string(),
            run_args: vec!["run".to_string()],
            list_args: vec!["list".to_string()],
            thinking_args: vec!["--think".to_string()],
            hide_thinking_args: vec!["--hidethinking".to_string()],
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub models: Vec<String>,
    pub times: u32,
    pub parallelism: u32,
    pub thinking: bool,
    pub correction: bool,
    /// Parent of the timestamped run directory.
    pub output_root: PathBuf,
    /// Exact run directory (`--out-dir`); bypasses the timestamped name.
    pub out_dir: Option<PathBuf>,
    pub pipeline: PipelinePreset,
    /// Seed for random model sampling.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            times: 1,
            parallelism: 1,
            thinking: false,
            correction: false,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            out_dir: None,
            pipeline: PipelinePreset::default(),
            seed: None,
        }
    }
}

/// Static-analysis collaborator used by the correction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionConfig {
    pub program: String,
    /// Arguments placed before the artifact path.
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Override for the corrective stage instruction.
    pub instruction: Option<String>,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_LINT_PROGRAM.to_string(),
            args: Vec::new(),
            timeout_secs: DEFAULT_CORRECTION_TIMEOUT_SECS,
            instruction: None,
        }
    }
}

/// Boundary markers for artifact extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub open_marker: String,
    pub close_marker: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            open_marker: DEFAULT_OPEN_MARKER.to_string(),
            close_marker: DEFAULT_CLOSE_MARKER.to_string(),
        }
    }
}

/// One stage of a custom chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub instruction: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "txt".to_string()
}

impl StageConfig {
    #[must_use]
    pub fn new(name: &str, instruction: &str, extension: &str) -> Self {
        Self {
            name: name.to_string(),
            instruction: instruction.to_string(),
            extension: extension.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            run: RunConfig::default(),
            correction: CorrectionConfig::default(),
            document: DocumentConfig::default(),
            stages: Vec::new(),
            source_attribution: HashMap::new(),
            config_path: None,
        }
    }
}

impl Config {
    /// Replace the model list, e.g. after random sampling.
    pub fn set_models(&mut self, models: Vec<String>, source: ConfigSource) {
        self.run.models = models;
        self.source_attribution.insert("models".to_string(), source);
    }
}
