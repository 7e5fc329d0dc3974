//! # PageSub
//!
//! `pagesub` is an in-process publish/subscribe broker for browser tests. A
//! page produces events (analytics network hits, data-layer pushes), the
//! browser glue publishes them, and the test body reads the recorded log or
//! waits, with a deadline, for the first future event that matches.
//!
//! ## Core Modules
//!
//! - `broker`: the message log, subscriber fan-out and `wait_for_message`.
//! - `matcher`: match policies (regex, structural template, JSON Schema, predicate).
//! - `session`: per-test context owning the GA4, GA3 and data-layer brokers.
//! - `config`: loading session settings from files and environment variables.
//! - `utils`: error type and logging setup.
//!
//! ## Example
//!
//! ```no_run
//! use pagesub::broker::WaitOptions;
//! use pagesub::config::Settings;
//! use pagesub::session::PageSession;
//! use serde_json::json;
//!
//! # async fn run() -> pagesub::utils::Result<()> {
//! let session = PageSession::new(&Settings::default())?;
//! let purchase = session
//!     .data_layer()
//!     .wait_for_message(WaitOptions::match_object(json!({"event": "purchase"})).with_timeout_ms(2000))?;
//!
//! // browser glue, on window.dataLayer.push(...)
//! session.record_data_layer_push(json!({"event": "purchase", "value": 10}));
//!
//! let entry = purchase.await?;
//! assert_eq!(entry["value"], 10);
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod matcher;
pub mod session;
pub mod utils;

pub use broker::{DataLayerMessage, HitMessage, Message, MessageBroker, Subscriber, WaitHandle, WaitOptions};
pub use matcher::MatchPolicy;
pub use session::PageSession;
pub use utils::{BrokerError, Result};
