use std::path::PathBuf;

use boidfactory_utils::ConfigError;

use super::{Config, ConfigSource, PipelinePreset, StageConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// No config file or environment variable is consulted.
    ///
    /// ```rust
    /// use boidfactory_config::Config;
    ///
    /// let config = Config::builder()
    ///     .models(["qwen3:8b"])
    ///     .times(4)
    ///     .parallelism(2)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.run.parallelism, 2);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent construction of a [`Config`] for embedding and tests.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&mut self, key: &str) {
        self.config
            .source_attribution
            .insert(key.to_string(), ConfigSource::Programmatic);
    }

    #[must_use]
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.run.models = models.into_iter().map(Into::into).collect();
        self.mark("models");
        self
    }

    #[must_use]
    pub fn times(mut self, times: u32) -> Self {
        self.config.run.times = times;
        self.mark("times");
        self
    }

    #[must_use]
    pub fn parallelism(mut self, parallelism: u32) -> Self {
        self.config.run.parallelism = parallelism;
        self.mark("parallelism");
        self
    }

    #[must_use]
    pub fn thinking(mut self, enabled: bool) -> Self {
        self.config.run.thinking = enabled;
        self.mark("thinking");
        self
    }

    #[must_use]
    pub fn correction(mut self, enabled: bool) -> Self {
        self.config.run.correction = enabled;
        self.mark("correction");
        self
    }

    #[must_use]
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.run.output_root = root.into();
        self.mark("output_dir");
        self
    }

    #[must_use]
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.run.out_dir = Some(dir.into());
        self.mark("output_dir");
        self
    }

    #[must_use]
    pub fn pipeline(mut self, preset: PipelinePreset) -> Self {
        self.config.run.pipeline = preset;
        self.mark("pipeline");
        self
    }

    #[must_use]
    pub fn stages(mut self, stages: Vec<StageConfig>) -> Self {
        self.config.stages = stages;
        self.mark("pipeline");
        self
    }

    #[must_use]
    pub fn generator_program(mut self, program: impl Into<String>) -> Self {
        self.config.generator.program = program.into();
        self.mark("generator.program");
        self
    }

    #[must_use]
    pub fn generator_run_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.generator.run_args = args.into_iter().map(Into::into).collect();
        self.mark("generator.run_args");
        self
    }

    #[must_use]
    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.config.generator.stage_timeout_secs = secs;
        self.mark("stage_timeout_secs");
        self
    }

    #[must_use]
    pub fn lint_program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.config.correction.program = program.into();
        self.config.correction.args = args;
        self.mark("correction.program");
        self
    }

    /// Finish building. Fails on values that can never be valid
    /// (zero `times` or `parallelism`); other checks run in [`Config::pipeline`].
    pub fn build(self) -> Result<Config, ConfigError> {
        if self.config.run.times == 0 {
            return Err(ConfigError::InvalidValue {
                key: "times".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }
        if self.config.run.parallelism == 0 {
            return Err(ConfigError::InvalidValue {
                key: "parallelism".to_string(),
                value: "must be greater than 0".to_string(),
            });
        }
        Ok(self.config)
    }
}
