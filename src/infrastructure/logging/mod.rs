//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber, driven by the
//! `logging` configuration section. `RUST_LOG` overrides the configured
//! level when set, which keeps ad hoc debugging one environment variable
//! away.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::domain::models::LoggingConfig;

/// Initialize the global tracing subscriber from the logging config.
///
/// Safe to call more than once; subsequent calls are no-ops (relevant in
/// tests, where several entry points may race to initialize).
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    // Already initialized is fine.
    drop(result);
}
