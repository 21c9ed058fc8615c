//! Exit code constants and error mapping for boidfactory.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | The batch ran to completion (individual jobs may have failed) |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |

use crate::error::BoidfactoryError;

/// Type-safe process exit code.
///
/// ```rust
/// use boidfactory_utils::ExitCode;
///
/// assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - the batch completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid flags, configuration or prompt source
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Get the numeric exit code value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl BoidfactoryError {
    /// Map the error to the exit code reported by the CLI.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::Prompt { .. } | Self::GeneratorUnavailable { .. } => {
                ExitCode::CLI_ARGS
            }
            Self::Io(_) | Self::Runtime { .. } => ExitCode::INTERNAL,
        }
    }
}
