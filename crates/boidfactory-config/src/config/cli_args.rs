use std::path::PathBuf;

use super::PipelinePreset;

/// CLI-provided configuration values (highest precedence).
///
/// `None` and empty vectors mean "not given on the command line".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub models: Vec<String>,
    pub times: Option<u32>,
    pub parallelism: Option<u32>,
    pub thinking: Option<bool>,
    pub correction: Option<bool>,
    pub output_root: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub pipeline: Option<PipelinePreset>,
    pub seed: Option<u64>,
    pub stage_timeout_secs: Option<u64>,
    pub generator_program: Option<String>,
}
