use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use boidfactory_utils::ConfigError;

use super::env::EnvOverrides;
use super::{
    CliArgs, Config, ConfigSource, CorrectionConfig, DocumentConfig, GeneratorConfig,
    PipelinePreset, RunConfig, StageConfig,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    generator: Option<TomlGenerator>,
    run: Option<TomlRun>,
    correction: Option<TomlCorrection>,
    document: Option<TomlDocument>,
    #[serde(default)]
    stages: Vec<StageConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGenerator {
    program: Option<String>,
    run_args: Option<Vec<String>>,
    list_args: Option<Vec<String>>,
    thinking_args: Option<Vec<String>>,
    hide_thinking_args: Option<Vec<String>>,
    stage_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRun {
    models: Option<Vec<String>>,
    times: Option<u32>,
    parallelism: Option<u32>,
    thinking: Option<bool>,
    correction: Option<bool>,
    output_dir: Option<PathBuf>,
    pipeline: Option<PipelinePreset>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlCorrection {
    program: Option<String>,
    args: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    instruction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDocument {
    open_marker: Option<String>,
    close_marker: Option<String>,
}

/// Overwrite `slot` when `value` is present and record where it came from.
fn apply<T>(
    slot: &mut T,
    value: Option<T>,
    key: &str,
    source: ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if let Some(v) = value {
        *slot = v;
        attribution.insert(key.to_string(), source);
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args, &|key: &str| std::env::var(key).ok())
    }

    /// Path- and environment-driven variant of [`Config::discover`].
    ///
    /// Tests pass their own `env` lookup instead of mutating process state.
    pub fn discover_from(
        start_dir: &Path,
        cli_args: &CliArgs,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Config::default();
        let attribution = &mut config.source_attribution;

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file = Self::load_config_file(path)?;
            let src = ConfigSource::Config;

            if let Some(g) = file.generator {
                let gen_cfg: &mut GeneratorConfig = &mut config.generator;
                apply(&mut gen_cfg.program, g.program, "generator.program", src, attribution);
                apply(&mut gen_cfg.run_args, g.run_args, "generator.run_args", src, attribution);
                apply(&mut gen_cfg.list_args, g.list_args, "generator.list_args", src, attribution);
                apply(
                    &mut gen_cfg.thinking_args,
                    g.thinking_args,
                    "generator.thinking_args",
                    src,
                    attribution,
                );
                apply(
                    &mut gen_cfg.hide_thinking_args,
                    g.hide_thinking_args,
                    "generator.hide_thinking_args",
                    src,
                    attribution,
                );
                apply(
                    &mut gen_cfg.stage_timeout_secs,
                    g.stage_timeout_secs,
                    "stage_timeout_secs",
                    src,
                    attribution,
                );
            }

            if let Some(r) = file.run {
                let run: &mut RunConfig = &mut config.run;
                apply(&mut run.models, r.models, "models", src, attribution);
                apply(&mut run.times, r.times, "times", src, attribution);
                apply(&mut run.parallelism, r.parallelism, "parallelism", src, attribution);
                apply(&mut run.thinking, r.thinking, "thinking", src, attribution);
                apply(&mut run.correction, r.correction, "correction", src, attribution);
                apply(&mut run.output_root, r.output_dir, "output_dir", src, attribution);
                apply(&mut run.pipeline, r.pipeline, "pipeline", src, attribution);
                apply(&mut run.seed, r.seed.map(Some), "seed", src, attribution);
            }

            if let Some(c) = file.correction {
                let corr: &mut CorrectionConfig = &mut config.correction;
                apply(&mut corr.program, c.program, "correction.program", src, attribution);
                apply(&mut corr.args, c.args, "correction.args", src, attribution);
                apply(
                    &mut corr.timeout_secs,
                    c.timeout_secs,
                    "correction.timeout_secs",
                    src,
                    attribution,
                );
                apply(
                    &mut corr.instruction,
                    c.instruction.map(Some),
                    "correction.instruction",
                    src,
                    attribution,
                );
            }

            if let Some(d) = file.document {
                let doc: &mut DocumentConfig = &mut config.document;
                apply(&mut doc.open_marker, d.open_marker, "document.open_marker", src, attribution);
                apply(&mut doc.close_marker, d.close_marker, "document.close_marker", src, attribution);
            }

            if !file.stages.is_empty() {
                config.stages = file.stages;
                attribution.insert("pipeline".to_string(), src);
            }
        }

        let env = EnvOverrides::read(env)?;
        let src = ConfigSource::Env;
        apply(&mut config.run.thinking, env.thinking, "thinking", src, attribution);
        apply(&mut config.run.correction, env.correction, "correction", src, attribution);
        apply(&mut config.generator.program, env.generator, "generator.program", src, attribution);

        let src = ConfigSource::Cli;
        if !cli_args.models.is_empty() {
            apply(&mut config.run.models, Some(cli_args.models.clone()), "models", src, attribution);
        }
        apply(&mut config.run.times, cli_args.times, "times", src, attribution);
        apply(&mut config.run.parallelism, cli_args.parallelism, "parallelism", src, attribution);
        apply(&mut config.run.thinking, cli_args.thinking, "thinking", src, attribution);
        apply(&mut config.run.correction, cli_args.correction, "correction", src, attribution);
        apply(
            &mut config.run.output_root,
            cli_args.output_root.clone(),
            "output_dir",
            src,
            attribution,
        );
        apply(
            &mut config.run.out_dir,
            cli_args.out_dir.clone().map(Some),
            "output_dir",
            src,
            attribution,
        );
        if cli_args.pipeline.is_some() {
            // An explicit preset on the command line beats custom file stages.
            config.stages.clear();
        }
        apply(&mut config.run.pipeline, cli_args.pipeline, "pipeline", src, attribution);
        apply(&mut config.run.seed, cli_args.seed.map(Some), "seed", src, attribution);
        apply(
            &mut config.generator.stage_timeout_secs,
            cli_args.stage_timeout_secs,
            "stage_timeout_secs",
            src,
            attribution,
        );
        apply(
            &mut config.generator.program,
            cli_args.generator_program.clone(),
            "generator.program",
            src,
            attribution,
        );

        config.config_path = config_path;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.boidfactory/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root marker.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current = Some(start_dir);
        while let Some(dir) = current {
            let candidate = dir.join(".boidfactory").join("config.toml");
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists() {
                break;
            }
            current = dir.parent();
        }
        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {e}", path.display())).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let cfg_dir = dir.join(".boidfactory");
        fs::create_dir_all(&cfg_dir).unwrap();
        let path = cfg_dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_without_any_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let config = Config::discover_from(dir.path(), &CliArgs::default(), &no_env).unwrap();
        assert_eq!(config.generator.program, "ollama");
        assert_eq!(config.run.times, 1);
        assert!(config.config_path.is_none());
        assert!(config.source_attribution.is_empty());
    }

    #[test]
    fn file_is_found_from_a_nested_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        write_config(
            dir.path(),
            r#"
[run]
models = ["qwen3:8b"]
times = 6
pipeline = "direct"
"#,
        );
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover_from(&nested, &CliArgs::default(), &no_env).unwrap();
        assert_eq!(config.run.models, ["qwen3:8b"]);
        assert_eq!(config.run.times, 6);
        assert_eq!(config.run.pipeline, PipelinePreset::Direct);
        assert_eq!(config.source_attribution["times"], ConfigSource::Config);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        write_config(
            dir.path(),
            r#"
[run]
thinking = true
correction = true
times = 3
"#,
        );
        let env = |key: &str| match key {
            "BOIDFACTORY_CORRECTION" => Some("0".to_string()),
            "BOIDFACTORY_THINKING" => Some("no".to_string()),
            _ => None,
        };
        let cli = CliArgs {
            thinking: Some(true),
            times: Some(8),
            ..CliArgs::default()
        };

        let config = Config::discover_from(dir.path(), &cli, &env).unwrap();
        assert!(config.run.thinking);
        assert!(!config.run.correction);
        assert_eq!(config.run.times, 8);
        assert_eq!(config.source_attribution["thinking"], ConfigSource::Cli);
        assert_eq!(config.source_attribution["correction"], ConfigSource::Env);
    }

    #[test]
    fn unknown_keys_are_invalid_files() {
        let dir = TempDir::new().unwrap();
        let path = write_config(dir.path(), "[run]\nparalelism = 2\n");
        let cli = CliArgs {
            config_path: Some(path),
            ..CliArgs::default()
        };
        let err = Config::discover_from(dir.path(), &cli, &no_env).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(config_err, ConfigError::InvalidFile(_)));
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(dir.path().join("nope.toml")),
            ..CliArgs::default()
        };
        let err = Config::discover_from(dir.path(), &cli, &no_env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn custom_stages_load_and_cli_preset_replaces_them() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[[stages]]
name = "outline"
instruction = "Outline {{prompt}}"
extension = "md"

[[stages]]
name = "page"
instruction = "Page for {{input}}"
extension = "html"
"#,
        );
        let mut cli = CliArgs {
            config_path: Some(path),
            ..CliArgs::default()
        };
        let config = Config::discover_from(dir.path(), &cli, &no_env).unwrap();
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.stages[1].extension, "html");

        cli.pipeline = Some(PipelinePreset::Direct);
        let config = Config::discover_from(dir.path(), &cli, &no_env).unwrap();
        assert!(config.stages.is_empty());
    }

    #[test]
    fn invalid_env_bool_aborts_discovery() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let env = |key: &str| (key == "BOIDFACTORY_CORRECTION").then(|| "maybe".to_string());
        let err = Config::discover_from(dir.path(), &CliArgs::default(), &env).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
