//! Tracing subscriber setup.
//!
//! Filter comes from `RUST_LOG` (default `info`); output is plain text or
//! one JSON object per line. Logs go to stderr so stdout stays clean for
//! JSON results.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_tracing(log_json: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    // Already initialised (tests, embedding): keep the existing subscriber.
    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already set");
    }
}
