//! The `error` module defines the error taxonomy of the broker.
//!
//! Only three things can go wrong with a wait: it was configured badly, it
//! ran out of time, or the caller's own predicate blew up. A message that
//! simply does not match is never an error.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The wait options were rejected before any subscription was created.
    #[error("invalid wait configuration: {0}")]
    Configuration(String),

    /// No matching message arrived before the deadline.
    #[error("{}", describe_timeout(.timeout, .message))]
    Timeout {
        timeout: Duration,
        message: Option<String>,
    },

    /// A caller-supplied predicate panicked while evaluating a message.
    #[error("predicate panicked: {0}")]
    PredicatePanicked(String),

    /// The broker was closed while the wait was pending, or before it started.
    #[error("broker closed")]
    Closed,
}

impl BrokerError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

fn describe_timeout(timeout: &Duration, message: &Option<String>) -> String {
    match message {
        Some(message) => message.clone(),
        None => format!("timeout after {}ms", timeout.as_millis()),
    }
}
