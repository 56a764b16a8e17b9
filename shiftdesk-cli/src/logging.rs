//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::CliError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// client envelopes.
///
/// `RUST_LOG` wins over the configured filter.
pub fn init(config: &LoggingConfig) -> Result<(), CliError> {
    let fallback = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| CliError::Logging(e.to_string()))
}
