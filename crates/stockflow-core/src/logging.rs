//! Console logging bootstrap.
//!
//! The engines themselves only emit `tracing` events; embedding applications
//! call [`init_console_logging`] once at startup to get formatted console
//! output.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize compact console logging.
///
/// # Configuration
///
/// - **Log Level**: controlled by the `LOG_LEVEL` environment variable
///   (default: "info")
/// - **Filtering**: `RUST_LOG` takes precedence when set; sqlx is capped at
///   warn for cleaner output
pub fn init_console_logging() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", log_level)));

    let console_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(console_layer).init();
}
