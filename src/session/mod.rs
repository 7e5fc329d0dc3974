//! Page session
//!
//! A `PageSession` is the per-test context that owns the three message
//! streams observed on one page:
//! - `collects_ga4`: GA4 network hits, as flattened request URLs
//! - `collects_ga3`: Universal Analytics network hits
//! - `data_layer`: entries pushed onto `window.dataLayer`
//!
//! The browser glue calls the `record_*` hooks as events happen; the test body
//! reads the logs and waits on the brokers. Dropping the session (or calling
//! `close`) closes all three brokers, so waits still pending at the end of a
//! test fail with `BrokerError::Closed` instead of hanging.

mod filter;


use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::broker::{DataLayerMessage, HitMessage, MessageBroker, WaitOptions};
use crate::config::Settings;
use crate::utils::Result;

pub use filter::HitFilter;

/// Key stamped on every pushed data-layer object: milliseconds since the
/// session started, rounded.
pub const PERF_NOW_KEY: &str = "_perfNow";

/// Streams a request URL was published to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitRouting {
    pub ga4: bool,
    pub ga3: bool,
}

impl HitRouting {
    pub fn is_hit(&self) -> bool {
        self.ga4 || self.ga3
    }
}

pub struct PageSession {
    collects_ga4: MessageBroker<HitMessage>,
    collects_ga3: MessageBroker<HitMessage>,
    data_layer: MessageBroker<DataLayerMessage>,
    ga4_filter: HitFilter,
    ga3_filter: HitFilter,
    default_timeout: Duration,
    started: Instant,
}

impl PageSession {
    /// Open a session with fresh, empty brokers. Fails if a hit pattern does
    /// not compile.
    pub fn new(settings: &Settings) -> Result<Self> {
        let session = Self {
            collects_ga4: MessageBroker::new(),
            collects_ga3: MessageBroker::new(),
            data_layer: MessageBroker::new(),
            ga4_filter: HitFilter::new(&settings.hits.ga4)?,
            ga3_filter: HitFilter::new(&settings.hits.ga3)?,
            default_timeout: Duration::from_millis(settings.wait.default_timeout_ms),
            started: Instant::now(),
        };
        debug!(default_timeout = ?session.default_timeout, "page session opened");
        Ok(session)
    }

    pub fn collects_ga4(&self) -> &MessageBroker<HitMessage> {
        &self.collects_ga4
    }

    pub fn collects_ga3(&self) -> &MessageBroker<HitMessage> {
        &self.collects_ga3
    }

    pub fn data_layer(&self) -> &MessageBroker<DataLayerMessage> {
        &self.data_layer
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Give `options` the session's default timeout unless it has its own.
    pub fn with_default_timeout<M>(&self, options: WaitOptions<M>) -> WaitOptions<M> {
        match options.timeout() {
            Some(_) => options,
            None => options.with_timeout(self.default_timeout),
        }
    }

    /// Route an outgoing request to the hit streams whose filter accepts it.
    pub fn record_request(&self, flat_url: &str) -> HitRouting {
        let routing = HitRouting {
            ga4: self.ga4_filter.accepts(flat_url),
            ga3: self.ga3_filter.accepts(flat_url),
        };
        if routing.ga4 {
            self.collects_ga4.publish(flat_url.to_string());
        }
        if routing.ga3 {
            self.collects_ga3.publish(flat_url.to_string());
        }
        routing
    }

    /// Publish an entry pushed onto the data layer. Object entries get
    /// `_perfNow` set to the session's elapsed milliseconds first.
    pub fn record_data_layer_push(&self, mut entry: DataLayerMessage) {
        if let Value::Object(fields) = &mut entry {
            fields.insert(PERF_NOW_KEY.to_string(), json!(self.elapsed_ms()));
        }
        self.data_layer.publish(entry);
    }

    /// Publish the entries the data layer already held when the page first
    /// assigned it, in order and without a timestamp.
    pub fn record_data_layer_init<I>(&self, entries: I)
    where
        I: IntoIterator<Item = DataLayerMessage>,
    {
        for entry in entries {
            self.data_layer.publish(entry);
        }
    }

    /// End the session. Same as dropping it.
    pub fn close(self) {
        drop(self);
    }

    fn elapsed_ms(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * 1000.0).round() as u64
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.collects_ga4.close();
        self.collects_ga3.close();
        self.data_layer.close();
        info!(
            ga4_hits = self.collects_ga4.message_count(),
            ga3_hits = self.collects_ga3.message_count(),
            data_layer_entries = self.data_layer.message_count(),
            "page session closed"
        );
    }
}
