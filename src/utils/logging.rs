//! Log output for test runs.
//!
//! `RUST_LOG` wins when it is set; otherwise the configured level applies to
//! every target. Installation uses `try_init`, so each test may call it and
//! only the first call in a binary takes effect.

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Install the subscriber with the level from `settings.logging`.
pub fn init_from(settings: &Settings) {
    init(&settings.logging.level);
}

/// Install the subscriber with `level` ("error", "warn", "info", "debug",
/// "trace"; anything else means "info").
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

pub(crate) fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}
