use std::collections::HashSet;

use boidfactory_utils::ConfigError;

use super::{Config, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS};

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn is_path_safe(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn check_timeout(key: &str, secs: u64) -> Result<(), ConfigError> {
    if secs < MIN_TIMEOUT_SECS {
        return Err(invalid(key, format!("must be at least {MIN_TIMEOUT_SECS} seconds")));
    }
    if secs > MAX_TIMEOUT_SECS {
        return Err(invalid(
            key,
            format!("exceeds maximum limit of {MAX_TIMEOUT_SECS} seconds (2 hours)"),
        ));
    }
    Ok(())
}

impl Config {
    /// Validate configuration values. Runs before anything is scheduled.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.run.times == 0 {
            return Err(invalid("times", "must be greater than 0"));
        }
        if self.run.parallelism == 0 {
            return Err(invalid("parallelism", "must be greater than 0"));
        }

        if self.run.models.is_empty() {
            return Err(ConfigError::MissingRequired("models".to_string()));
        }
        for model in &self.run.models {
            if model.trim().is_empty() {
                return Err(invalid("models", "model ids must not be empty"));
            }
        }

        if self.generator.program.trim().is_empty() {
            return Err(invalid("generator.program", "must not be empty"));
        }
        check_timeout("stage_timeout_secs", self.generator.stage_timeout_secs)?;

        if self.run.correction {
            if self.correction.program.trim().is_empty() {
                return Err(invalid(
                    "correction.program",
                    "a lint program is required when correction is enabled",
                ));
            }
            check_timeout("correction.timeout_secs", self.correction.timeout_secs)?;
            if let Some(instruction) = &self.correction.instruction
                && !instruction.contains("{{diagnostics}}")
            {
                return Err(invalid(
                    "correction.instruction",
                    "must reference {{diagnostics}}",
                ));
            }
        }

        if self.document.open_marker.trim().is_empty() {
            return Err(invalid("document.open_marker", "must not be empty"));
        }
        if self.document.close_marker.trim().is_empty() {
            return Err(invalid("document.close_marker", "must not be empty"));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !is_path_safe(&stage.name) {
                return Err(invalid(
                    "stages.name",
                    format!("'{}' must be non-empty and use only [A-Za-z0-9_-]", stage.name),
                ));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(invalid("stages.name", format!("duplicate stage '{}'", stage.name)));
            }
            if stage.instruction.trim().is_empty() {
                return Err(invalid(
                    "stages.instruction",
                    format!("stage '{}' has an empty instruction", stage.name),
                ));
            }
            if stage.extension.is_empty()
                || !stage.extension.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(invalid(
                    "stages.extension",
                    format!("'{}' must be alphanumeric", stage.extension),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StageConfig;

    fn valid() -> Config {
        Config::builder().models(["m"]).build().unwrap()
    }

    fn key_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidValue { key, .. } => key,
            ConfigError::MissingRequired(key) => key,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn defaults_with_a_model_are_valid() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_times_and_parallelism_are_rejected() {
        let mut config = valid();
        config.run.times = 0;
        assert_eq!(key_of(config.validate().unwrap_err()), "times");

        let mut config = valid();
        config.run.parallelism = 0;
        assert_eq!(key_of(config.validate().unwrap_err()), "parallelism");
    }

    #[test]
    fn missing_models_are_reported() {
        let config = Config::default();
        assert_eq!(key_of(config.validate().unwrap_err()), "models");
    }

    #[test]
    fn timeout_bounds() {
        let mut config = valid();
        config.generator.stage_timeout_secs = 4;
        assert!(config.validate().is_err());
        config.generator.stage_timeout_secs = 7201;
        assert!(config.validate().is_err());
        config.generator.stage_timeout_secs = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn correction_requires_lint_program_only_when_enabled() {
        let mut config = valid();
        config.correction.program = String::new();
        assert!(config.validate().is_ok());
        config.run.correction = true;
        assert_eq!(key_of(config.validate().unwrap_err()), "correction.program");
    }

    #[test]
    fn stage_names_must_be_unique_and_path_safe() {
        let mut config = valid();
        config.stages = vec![
            StageConfig::new("spec", "a", "md"),
            StageConfig::new("spec", "b", "md"),
        ];
        assert!(config.validate().is_err());

        config.stages = vec![StageConfig::new("../escape", "a", "md")];
        assert!(config.validate().is_err());

        config.stages = vec![StageConfig::new("spec", "a", "m.d")];
        assert_eq!(key_of(config.validate().unwrap_err()), "stages.extension");
    }

    #[test]
    fn empty_markers_are_rejected() {
        let mut config = valid();
        config.document.close_marker = " ".to_string();
        assert_eq!(
            key_of(config.validate().unwrap_err()),
            "document.close_marker"
        );
    }
}
