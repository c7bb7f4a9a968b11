//! Logging setup
//!
//! `RUST_LOG` takes priority over the configured level so a single run can be
//! made noisier without touching config files.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Fallback level when `RUST_LOG` is unset
    pub level: String,

    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,

    /// Include the event target (module path)
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// `debug` when verbose, `info` otherwise
    pub fn verbose(verbose: bool) -> Self {
        Self {
            level: if verbose { "debug" } else { "info" }.to_string(),
            ..Default::default()
        }
    }
}

/// Check that `level` is one of trace, debug, info, warn, error
pub fn validate_level(level: &str) -> Result<()> {
    if VALID_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "invalid log level '{}', expected one of: {}",
            level,
            VALID_LEVELS.join(", ")
        )))
    }
}

/// Install the global subscriber.
///
/// Calling this again after a subscriber is installed is a no-op, so test
/// binaries can call it from every test.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    validate_level(&config.level)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = installed {
        tracing::debug!("Subscriber already installed: {}", e);
    }

    Ok(())
}
