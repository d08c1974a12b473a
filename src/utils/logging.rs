use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::utils::configuration::LoggingConfig;

/// Install the global tracing subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` when a
/// subscriber was already installed (e.g. by the embedding application or an
/// earlier test), in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format.as_str() {
        "compact" => registry.with(fmt::layer().compact()).try_init().is_ok(),
        _ => registry
            .with(fmt::layer().without_time().with_target(false))
            .try_init()
            .is_ok(),
    };

    if installed {
        info!("Logging initialised at level {}", config.level);
    }
    installed
}
