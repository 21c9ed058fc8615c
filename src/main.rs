//! boidfactory CLI binary
//!
//! All logic is in the library; main.rs only invokes cli::run().

use boidfactory_utils::ExitCode;

fn main() {
    // cli::run() prints its own errors; main only maps to the process exit code
    let code = match boidfactory::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    };
    std::process::exit(code.as_i32());
}
