//! # Logging Setup
//!
//! Installs the global tracing subscriber: an env filter, a console layer and a
//! daily-rolling log file written through a non-blocking appender.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingConfig;

/// `RUST_LOG` wins over the configured filter.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Initializes logging. Keep the returned guard alive for the whole process,
/// dropping it flushes and stops the file writer.
pub fn init(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Layer for file (Always active)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(guard)
}
