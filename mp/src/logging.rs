//! Log output setup
//!
//! Logging is scoped rather than process-global: [`init`] installs a
//! subscriber as the default for the current thread and returns a
//! [`LogGuard`]. Dropping the guard restores the previous subscriber.
//! Log lines go to stderr so stdout stays free for command output.

use eyre::{Context, Result};
use tracing::Dispatch;
use tracing::dispatcher::DefaultGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Keeps the subscriber installed until dropped
pub struct LogGuard {
    _default: DefaultGuard,
}

/// Build the dispatcher described by the config
pub fn build(config: &LoggingConfig, verbose: bool) -> Result<Dispatch> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config
            .level
            .parse::<tracing::Level>()
            .map_err(|_| eyre::eyre!("Unknown log level: {}", config.level))?
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let dispatch = match config.format {
        LogFormat::Json => Dispatch::new(
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .finish(),
        ),
        LogFormat::Text => Dispatch::new(
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_env_filter(filter)
                .finish(),
        ),
    };
    Ok(dispatch)
}

/// Install logging for the current thread
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<LogGuard> {
    let dispatch = build(config, verbose).context("Failed to build log subscriber")?;
    let guard = tracing::dispatcher::set_default(&dispatch);
    tracing::debug!(format = ?config.format, verbose, "Logging initialized");
    Ok(LogGuard { _default: guard })
}
