//! `tracing` subscriber installation.

use crate::config::{LogFormat, LoggingConfig};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter `{directive}`: {source}")]
    InvalidFilter {
        /// Rejected directive.
        directive: String,
        /// Underlying parse error.
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber is already installed.
    #[error("could not install tracing subscriber: {0}")]
    Install(String),
}

/// Builds the event filter for `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for malformed directives.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    let directive = config.level.trim();
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::InvalidFilter {
        directive: directive.to_owned(),
        source,
    })
}

/// Installs the global subscriber in the configured format.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| TelemetryError::Install(err.to_string()))?;

    tracing::debug!(
        event_name = "system.telemetry.initialised",
        format = %config.format,
        level = %config.level,
        "tracing subscriber installed"
    );
    Ok(())
}
