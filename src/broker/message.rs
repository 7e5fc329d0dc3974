//! Message shapes carried by a broker
//!
//! The broker itself never looks inside a message. It only clones it into the
//! log and hands it to subscribers. What a message exposes to match policies
//! is declared here through the `Message` trait:
//! - `HitMessage`: a flattened analytics request URL, matched as text
//! - `DataLayerMessage`: one entry pushed onto the page's data layer, matched
//!   structurally or against a schema

use std::fmt;

use serde_json::Value;

use crate::matcher::PolicyKind;

/// Flattened analytics network request URL.
pub type HitMessage = String;

/// Entry pushed onto the page's data layer.
pub type DataLayerMessage = Value;

pub trait Message: Clone + Send + Sync + fmt::Debug + 'static {
    /// Human-readable name of the stream, used in errors and logs.
    const KIND: &'static str;

    /// Whether a wait on this message type may use `policy`.
    fn accepts(policy: PolicyKind) -> bool;

    fn as_text(&self) -> Option<&str> {
        None
    }

    fn as_json(&self) -> Option<&Value> {
        None
    }
}

impl Message for HitMessage {
    const KIND: &'static str = "hit";

    fn accepts(policy: PolicyKind) -> bool {
        matches!(policy, PolicyKind::Regex | PolicyKind::Predicate)
    }

    fn as_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl Message for DataLayerMessage {
    const KIND: &'static str = "data layer";

    fn accepts(policy: PolicyKind) -> bool {
        matches!(
            policy,
            PolicyKind::MatchObject | PolicyKind::MatchSchema | PolicyKind::Predicate
        )
    }

    fn as_json(&self) -> Option<&Value> {
        Some(self)
    }
}
