use std::time::Duration;

use super::{BrokerError, logging};
use crate::config::Settings;

#[test]
fn logging_init_accepts_levels() {
    logging::init("info");
    logging::init("debug");
    logging::init("warning");
    logging::init("nonsense");
}

#[test]
fn logging_init_from_settings() {
    let mut settings = Settings::default();
    logging::init_from(&settings);
    settings.logging.level = "trace".to_string();
    logging::init_from(&settings);
}

#[test]
fn log_levels_map_to_filter_directives() {
    assert_eq!(logging::level_directive("warning"), "warn");
    assert_eq!(logging::level_directive(" DEBUG "), "debug");
    assert_eq!(logging::level_directive("error"), "error");
    assert_eq!(logging::level_directive("verbose"), "info");
    assert_eq!(logging::level_directive(&Settings::default().logging.level), "info");
}

#[test]
fn timeout_error_defaults_to_duration_text() {
    let err = BrokerError::Timeout {
        timeout: Duration::from_millis(250),
        message: None,
    };
    assert_eq!(err.to_string(), "timeout after 250ms");
    assert!(err.is_timeout());
}

#[test]
fn timeout_error_prefers_custom_message() {
    let err = BrokerError::Timeout {
        timeout: Duration::from_millis(250),
        message: Some("purchase event never fired".to_string()),
    };
    assert_eq!(err.to_string(), "purchase event never fired");
}

#[test]
fn configuration_error_carries_reason() {
    let err = BrokerError::configuration("no match policy given");
    assert_eq!(
        err.to_string(),
        "invalid wait configuration: no match policy given"
    );
    assert!(!err.is_timeout());
}
