//! Environment overrides.
//!
//! Boolean variables are parsed explicitly. A variable that is set but false
//! (`"0"`, `"false"`, ...) turns the feature off rather than on.

use boidfactory_utils::ConfigError;

pub const ENV_THINKING: &str = "BOIDFACTORY_THINKING";
pub const ENV_CORRECTION: &str = "BOIDFACTORY_CORRECTION";
pub const ENV_GENERATOR: &str = "BOIDFACTORY_GENERATOR";

/// Parse a boolean flag value.
///
/// Accepts `1/true/yes/on` and `0/false/no/off`, case-insensitively and
/// ignoring surrounding whitespace. Anything else is a configuration error
/// attributed to `key`.
///
/// ```rust
/// use boidfactory_config::parse_bool;
///
/// assert_eq!(parse_bool("BOIDFACTORY_CORRECTION", "0"), Ok(false));
/// assert_eq!(parse_bool("BOIDFACTORY_CORRECTION", " Yes "), Ok(true));
/// assert!(parse_bool("BOIDFACTORY_CORRECTION", "enabled").is_err());
/// ```
pub fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("'{raw}' is not a boolean"),
        }),
    }
}

/// Values read from the environment, already parsed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct EnvOverrides {
    pub thinking: Option<bool>,
    pub correction: Option<bool>,
    pub generator: Option<String>,
}

impl EnvOverrides {
    /// Read overrides through `lookup`. Empty values count as unset.
    pub(crate) fn read(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            thinking: get(ENV_THINKING)
                .map(|v| parse_bool(ENV_THINKING, &v))
                .transpose()?,
            correction: get(ENV_CORRECTION)
                .map(|v| parse_bool(ENV_CORRECTION, &v))
                .transpose()?,
            generator: get(ENV_GENERATOR),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn zero_disables_rather_than_enables() {
        let env = EnvOverrides::read(&lookup_from(&[(ENV_CORRECTION, "0")])).unwrap();
        assert_eq!(env.correction, Some(false));
    }

    #[test]
    fn accepted_spellings() {
        for raw in ["1", "true", "TRUE", "yes", "on", " On "] {
            assert_eq!(parse_bool("k", raw), Ok(true), "{raw}");
        }
        for raw in ["0", "false", "False", "no", "off"] {
            assert_eq!(parse_bool("k", raw), Ok(false), "{raw}");
        }
    }

    #[test]
    fn garbage_is_a_config_error_naming_the_variable() {
        let err = EnvOverrides::read(&lookup_from(&[(ENV_THINKING, "sometimes")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_THINKING.to_string(),
                value: "'sometimes' is not a boolean".to_string(),
            }
        );
    }

    #[test]
    fn empty_values_are_unset() {
        let env = EnvOverrides::read(&lookup_from(&[
            (ENV_CORRECTION, ""),
            (ENV_GENERATOR, "  "),
        ]))
        .unwrap();
        assert_eq!(env, EnvOverrides::default());
    }
}
