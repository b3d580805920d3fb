//! Logging initialization.
//!
//! All runtime modules log through `tracing`; this installs the subscriber.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// JSON lines, for post-session analysis.
    Json,
    /// Human-readable output for the operator console.
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Safe to call
/// multiple times; subsequent calls are no-ops.
pub fn init_logging(format: LogFormat, default_level: &str) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Span covering one participant run.
#[must_use]
pub fn run_span(run_id: &str, participant: &str, condition: u8) -> Span {
    tracing::info_span!(
        "run",
        run_id = run_id,
        participant = participant,
        condition = condition,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty, "warn");
        init_logging(LogFormat::Json, "debug");
    }

    #[test]
    fn test_run_span_enters() {
        let span = run_span("abc", "7", 3);
        let _guard = span.enter();
        tracing::info!("inside run span");
    }
}
