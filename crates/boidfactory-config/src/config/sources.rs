use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Config;

/// Where an effective configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Command-line flag (highest precedence).
    Cli,
    /// `BOIDFACTORY_*` environment variable.
    Env,
    /// `.boidfactory/config.toml`.
    Config,
    /// Set through [`Config::builder`].
    Programmatic,
    /// Built-in default (lowest precedence).
    Default,
}

impl ConfigSource {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut out = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            let source = self
                .source_attribution
                .get(key)
                .copied()
                .unwrap_or(ConfigSource::Default);
            out.insert(key.to_string(), (value, source.label().to_string()));
        };

        add("generator.program", self.generator.program.clone());
        add("generator.run_args", self.generator.run_args.join(" "));
        add(
            "stage_timeout_secs",
            self.generator.stage_timeout_secs.to_string(),
        );
        add("models", self.run.models.join(","));
        add("times", self.run.times.to_string());
        add("parallelism", self.run.parallelism.to_string());
        add("thinking", self.run.thinking.to_string());
        add("correction", self.run.correction.to_string());
        add(
            "output_dir",
            match &self.run.out_dir {
                Some(dir) => dir.display().to_string(),
                None => self.run.output_root.display().to_string(),
            },
        );
        add(
            "pipeline",
            if self.stages.is_empty() {
                self.run.pipeline.to_string()
            } else {
                let names: Vec<_> = self.stages.iter().map(|s| s.name.as_str()).collect();
                format!("custom [{}]", names.join(" -> "))
            },
        );
        if let Some(seed) = self.run.seed {
            add("seed", seed.to_string());
        }
        if self.run.correction {
            add("correction.program", self.correction.program.clone());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unattributed_keys_report_default() {
        let config = Config::default();
        let effective = config.effective_config();
        assert_eq!(
            effective.get("times"),
            Some(&("1".to_string(), "default".to_string()))
        );
        assert!(!effective.contains_key("seed"));
    }

    #[test]
    fn custom_stages_are_listed_in_order() {
        let mut config = Config::default();
        config.stages = vec![
            crate::StageConfig::new("outline", "x", "md"),
            crate::StageConfig::new("page", "y", "html"),
        ];
        let effective = config.effective_config();
        assert_eq!(effective["pipeline"].0, "custom [outline -> page]");
    }
}
