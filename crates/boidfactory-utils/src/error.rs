use std::fmt;
use thiserror::Error;

/// Top-level error for a boidfactory invocation.
///
/// Only failures that abort the whole run surface here. Job-level failures
/// (a stage that errors, an artifact with no document) are recorded in the
/// batch summary and run log instead and never become a process exit code.
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration, prompt and generator-discovery errors |
/// | 1 | Everything else |
#[derive(Error, Debug)]
pub enum BoidfactoryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Prompt error: {reason}")]
    Prompt { reason: String },

    #[error("Generator unavailable: {reason}")]
    GeneratorUnavailable { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run failed: {reason}")]
    Runtime { reason: String },
}

impl BoidfactoryError {
    /// Render the error with context and suggestions for terminal display.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("✗ {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n  {context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n  • {suggestion}"));
            }
        }
        out
    }
}

impl From<anyhow::Error> for BoidfactoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime {
            reason: format!("{err:#}"),
        }
    }
}

/// Trait for errors that carry operator-facing guidance.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Generation,
    FileSystem,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Generation => write!(f, "Generation"),
            Self::FileSystem => write!(f, "File System"),
            Self::Internal => write!(f, "Internal"),
        }
    }
}

/// Configuration errors. All of them are fatal and abort before any job starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => format!("Configuration file has invalid format: {reason}"),
            Self::MissingRequired(key) => format!("Required configuration '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files are TOML with [generator], [run], [correction], [document] and [[stages]] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => None,
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' option is checked before any generation job is scheduled."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "boidfactory searches for .boidfactory/config.toml starting from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .boidfactory/config.toml".to_string(),
                "Run `boidfactory plan` to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) if key == "models" => vec![
                "Pass --model <id> (repeatable) or --random-models <k>".to_string(),
                "Or set `models = [...]` under [run] in .boidfactory/config.toml".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Provide a value for '{key}'")],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "times" | "parallelism" => vec!["Use a positive integer".to_string()],
                "stage_timeout_secs" | "correction.timeout_secs" => {
                    vec!["Use a value between 5 and 7200 seconds".to_string()]
                }
                "correction.program" => vec![
                    "Install the linter or put it on PATH".to_string(),
                    "Set `program` under [correction] in .boidfactory/config.toml".to_string(),
                    "Run without --correct to skip the correction pass".to_string(),
                ],
                k if k.starts_with("BOIDFACTORY_") => vec![
                    "Use one of 1/true/yes/on or 0/false/no/off".to_string(),
                    format!("Unset {k} to fall back to the config file"),
                ],
                _ => vec!["Remove the option to use the default value".to_string()],
            },
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use upward discovery".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check read permissions on the current directory and its parents".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for BoidfactoryError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Prompt { reason } => format!("Could not read the operator prompt: {reason}"),
            Self::GeneratorUnavailable { reason } => {
                format!("The generation tool cannot be used: {reason}")
            }
            Self::Io(err) => format!("File system operation failed: {err}"),
            Self::Runtime { reason } => reason.clone(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Prompt { .. } => {
                Some("Exactly one of --prompt, --prompt-file or --edit must be given.".to_string())
            }
            Self::GeneratorUnavailable { .. } => Some(
                "Each stage runs `[generator].program` as a subprocess.".to_string(),
            ),
            Self::Io(_) | Self::Runtime { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Prompt { .. } => vec![
                "Check that the prompt file exists and is not empty".to_string(),
            ],
            Self::GeneratorUnavailable { .. } => vec![
                "Install the generator or put it on PATH".to_string(),
                "Set `program` under [generator] in .boidfactory/config.toml".to_string(),
            ],
            Self::Io(_) => vec!["Check permissions on the output directory".to_string()],
            Self::Runtime { .. } => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::Prompt { .. } => ErrorCategory::Configuration,
            Self::GeneratorUnavailable { .. } => ErrorCategory::Generation,
            Self::Io(_) => ErrorCategory::FileSystem,
            Self::Runtime { .. } => ErrorCategory::Internal,
        }
    }
}
