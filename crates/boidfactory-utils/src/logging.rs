//! Tracing initialisation.
//!
//! Diagnostics always go to stderr. Stdout belongs to the console lock
//! holder's live stage stream and to the final summary.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the boidfactory crates log at `info`
/// (`debug` with `verbose`) and everything else at `warn` (`info`).
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if verbose {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(span_events),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_span_events(span_events)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "boidfactory=debug,boidfactory_engine=debug,info"
    } else {
        "boidfactory=info,boidfactory_engine=info,warn"
    }
}
