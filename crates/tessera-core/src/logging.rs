use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::CoreError;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), CoreError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| CoreError::Config(format!("tracing init failed: {}", e)))
}
