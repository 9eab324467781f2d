use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Result, SandboxError};

/// Install the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// the configured level. Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| SandboxError::Logging(e.to_string()))
}
