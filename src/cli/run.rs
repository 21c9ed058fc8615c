//! CLI entry point and dispatch
//!
//! `run()` parses arguments, installs tracing, creates the tokio runtime,
//! dispatches to a command and owns all error output.

use clap::Parser;

use boidfactory_utils::{ExitCode, UserFriendlyError};
use boidfactory_utils::logging::{LogFormat, init_tracing};

use super::args::{Cli, Commands};
use super::commands::{self, GlobalOptions};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after printing the error; `main` only exits with it.
/// Jobs that fail inside a batch do not make this an error.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if let Err(e) = init_tracing(cli.verbose, format) {
        eprintln!("✗ Failed to initialise logging: {e}");
        return Err(ExitCode::INTERNAL);
    }

    let global = GlobalOptions {
        config_path: cli.config,
        generator: cli.generator,
    };

    let result = match cli.command {
        Commands::Run { args, json, quiet } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("✗ Failed to create async runtime: {e}");
                    return Err(ExitCode::INTERNAL);
                }
            };
            rt.block_on(commands::execute_run_command(&args, &global, json, quiet))
        }
        Commands::Plan { args, json } => commands::execute_plan_command(&args, &global, json),
        Commands::Models { json } => commands::execute_models_command(&global, json),
    };

    if let Err(error) = result {
        let code = error.to_exit_code();
        tracing::debug!(category = %error.category(), exit_code = code.as_i32(), "command failed");
        eprintln!("{}", error.display_for_user());
        return Err(code);
    }
    Ok(())
}
