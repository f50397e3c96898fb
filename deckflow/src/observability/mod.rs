//! Logging setup and timing helpers.

mod timer;

pub use timer::StageTimer;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the configured filter when set. Calling this twice
/// returns an error instead of panicking.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| anyhow::anyhow!("invalid log filter '{}': {e}", config.filter))?;

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_current_span(false))
            .with(filter)
            .try_init()?,
    }

    tracing::debug!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let config = LogConfig::default();
        // Another test may have installed a subscriber first; either way the
        // second call in this test must fail without panicking.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
