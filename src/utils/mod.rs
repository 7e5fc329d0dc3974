//! The `utils` module provides shared definitions used across `pagesub`:
//! the crate-wide error type and logging setup.

pub mod error;
pub mod logging;

pub use error::{BrokerError, Result};

#[cfg(test)]
mod tests;
