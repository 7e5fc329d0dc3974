//! Match policies
//!
//! A `MatchPolicy` is the test a pending wait applies to every message
//! published after it was registered. Evaluation is pure: `matches` never
//! mutates the message or the policy, and "does not match" is a plain `false`.
//!
//! Which policies make sense depends on the message shape. Flattened hit URLs
//! are tested with a regex or a predicate; structured data-layer entries with
//! a structural template, a JSON Schema, or a predicate. The broker checks
//! `Message::accepts` before it subscribes anything.

mod structural;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use serde_json::Value;

use crate::broker::Message;
use crate::utils::{BrokerError, Result};

pub use structural::matches_object;

/// Caller-supplied boolean test.
pub type Predicate<M> = Arc<dyn Fn(&M) -> bool + Send + Sync>;

pub enum MatchPolicy<M> {
    Regex(Regex),
    MatchObject(Value),
    MatchSchema(Arc<JSONSchema>),
    Predicate(Predicate<M>),
}

/// Discriminant of a `MatchPolicy`, used for validation and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Regex,
    MatchObject,
    MatchSchema,
    Predicate,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Regex => "regex",
            Self::MatchObject => "matchObject",
            Self::MatchSchema => "matchSchema",
            Self::Predicate => "predicate",
        };
        f.write_str(name)
    }
}

impl<M> MatchPolicy<M> {
    /// Compile `pattern` into a regex policy.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| BrokerError::configuration(format!("invalid regex {pattern:?}: {e}")))
    }

    /// Structural subset match against `template`.
    pub fn match_object(template: Value) -> Self {
        Self::MatchObject(template)
    }

    /// Compile a Draft 7 JSON Schema descriptor.
    pub fn match_schema(schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| BrokerError::configuration(format!("invalid schema: {e}")))?;
        Ok(Self::MatchSchema(Arc::new(compiled)))
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&M) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Regex(_) => PolicyKind::Regex,
            Self::MatchObject(_) => PolicyKind::MatchObject,
            Self::MatchSchema(_) => PolicyKind::MatchSchema,
            Self::Predicate(_) => PolicyKind::Predicate,
        }
    }
}

impl<M: Message> MatchPolicy<M> {
    /// Returns whether `message` satisfies this policy.
    ///
    /// A message without the shape a policy needs (a regex against a record,
    /// a template against plain text) does not match. Only `Predicate` runs
    /// foreign code, and a panic there unwinds to the caller.
    pub fn matches(&self, message: &M) -> bool {
        match self {
            Self::Regex(re) => message.as_text().is_some_and(|text| re.is_match(text)),
            Self::MatchObject(template) => message
                .as_json()
                .is_some_and(|value| matches_object(value, template)),
            Self::MatchSchema(schema) => message
                .as_json()
                .is_some_and(|value| schema.is_valid(value)),
            Self::Predicate(test) => test(message),
        }
    }
}

impl<M> Clone for MatchPolicy<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Regex(re) => Self::Regex(re.clone()),
            Self::MatchObject(template) => Self::MatchObject(template.clone()),
            Self::MatchSchema(schema) => Self::MatchSchema(Arc::clone(schema)),
            Self::Predicate(test) => Self::Predicate(Arc::clone(test)),
        }
    }
}

impl<M> fmt::Debug for MatchPolicy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::MatchObject(template) => f.debug_tuple("MatchObject").field(template).finish(),
            Self::MatchSchema(_) => f.write_str("MatchSchema(..)"),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
