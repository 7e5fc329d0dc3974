//! Structural subset matching.
//!
//! `message` matches `template` when every key of every object in the template
//! is present in the message at the same path with a matching value. Extra
//! keys in the message are ignored. Arrays must have the same length and
//! match element by element. Numbers compare by value; any other value must be
//! equal.

use serde_json::Value;

pub fn matches_object(message: &Value, template: &Value) -> bool {
    match (message, template) {
        (Value::Object(actual), Value::Object(expected)) => {
            expected.iter().all(|(key, expected)| {
                actual
                    .get(key)
                    .is_some_and(|actual| matches_object(actual, expected))
            })
        }
        (Value::Array(actual), Value::Array(expected)) => {
            actual.len() == expected.len()
                && actual
                    .iter()
                    .zip(expected)
                    .all(|(actual, expected)| matches_object(actual, expected))
        }
        // 1 and 1.0 are the same number on the page
        (Value::Number(actual), Value::Number(expected)) => actual.as_f64() == expected.as_f64(),
        (actual, expected) => actual == expected,
    }
}
