//! Logging initialization.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,ember=debug,ember_render=debug";

/// Installs a `tracing` subscriber writing to stderr.
///
/// Filtering follows `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Render
/// thread names (`ember-render-N`) are included in every line. Returns
/// `false` if a global subscriber was already installed, in which case
/// nothing changes.
///
/// # Example
/// ```
/// ember::init_logging();
/// tracing::info!("host started");
/// ```
pub fn init_logging() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_logging();
        assert!(!init_logging());
    }
}
