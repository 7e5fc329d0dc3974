use serde_json::json;

use super::{MatchPolicy, PolicyKind, matches_object};
use crate::broker::{DataLayerMessage, HitMessage};
use crate::utils::BrokerError;

#[test]
fn test_regex_policy_matches_text() {
    let policy = MatchPolicy::<HitMessage>::regex(r"collect\?v=2").unwrap();
    assert_eq!(policy.kind(), PolicyKind::Regex);
    assert!(policy.matches(&"https://www.google-analytics.com/g/collect?v=2&en=page_view".to_string()));
    assert!(!policy.matches(&"https://www.google-analytics.com/collect?v=1".to_string()));
}

#[test]
fn test_regex_policy_rejects_invalid_pattern() {
    let err = MatchPolicy::<HitMessage>::regex("(unclosed").unwrap_err();
    assert!(matches!(err, BrokerError::Configuration(_)));
}

#[test]
fn test_regex_never_matches_records() {
    let policy = MatchPolicy::<DataLayerMessage>::regex("event").unwrap();
    assert!(!policy.matches(&json!({"event": "page_view"})));
}

#[test]
fn test_structural_match_ignores_extra_keys() {
    assert!(matches_object(&json!({"a": 1, "b": 2}), &json!({"a": 1})));
    assert!(matches_object(&json!({"a": 1}), &json!({})));
}

#[test]
fn test_structural_match_recurses_into_objects() {
    let message = json!({
        "event": "purchase",
        "ecommerce": {"currency": "BRL", "value": 10.5, "coupon": "X"}
    });
    assert!(matches_object(
        &message,
        &json!({"ecommerce": {"currency": "BRL"}})
    ));
    assert!(!matches_object(
        &message,
        &json!({"ecommerce": {"currency": "USD"}})
    ));
    assert!(!matches_object(
        &message,
        &json!({"ecommerce": {"tax": 1}})
    ));
}

#[test]
fn test_structural_match_arrays_compare_element_wise() {
    let message = json!({"items": [{"id": "a", "qty": 1}, {"id": "b", "qty": 2}]});
    assert!(matches_object(
        &message,
        &json!({"items": [{"id": "a"}, {"id": "b"}]})
    ));
    assert!(!matches_object(&message, &json!({"items": [{"id": "a"}]})));
    assert!(!matches_object(
        &message,
        &json!({"items": [{"id": "b"}, {"id": "a"}]})
    ));
}

#[test]
fn test_structural_match_numbers_compare_by_value() {
    assert!(matches_object(&json!({"value": 1.0}), &json!({"value": 1})));
    assert!(!matches_object(&json!({"value": "1"}), &json!({"value": 1})));
}

#[test]
fn test_structural_match_mismatched_shapes_do_not_match() {
    assert!(!matches_object(&json!("text"), &json!({"a": 1})));
    assert!(!matches_object(&json!({"a": null}), &json!({"a": {}})));
    assert!(matches_object(&json!({"a": null}), &json!({"a": null})));
}

#[test]
fn test_match_object_policy() {
    let policy = MatchPolicy::<DataLayerMessage>::match_object(json!({"event": "gtm.js"}));
    assert_eq!(policy.kind(), PolicyKind::MatchObject);
    assert!(policy.matches(&json!({"event": "gtm.js", "gtm.start": 1})));
    assert!(!policy.matches(&json!({"event": "gtm.dom"})));
}

#[test]
fn test_match_object_policy_never_matches_text() {
    let policy = MatchPolicy::<HitMessage>::match_object(json!("abc"));
    assert!(!policy.matches(&"abc".to_string()));
}

#[test]
fn test_schema_policy() {
    let schema = json!({
        "type": "object",
        "required": ["event"],
        "properties": {"event": {"type": "string", "pattern": "^view_"}}
    });
    let policy = MatchPolicy::<DataLayerMessage>::match_schema(&schema).unwrap();
    assert_eq!(policy.kind(), PolicyKind::MatchSchema);
    assert!(policy.matches(&json!({"event": "view_item"})));
    assert!(!policy.matches(&json!({"event": "add_to_cart"})));
    assert!(!policy.matches(&json!({"other": true})));
}

#[test]
fn test_schema_policy_rejects_invalid_schema() {
    let err = MatchPolicy::<DataLayerMessage>::match_schema(&json!({"type": 12})).unwrap_err();
    assert!(matches!(err, BrokerError::Configuration(_)));
}

#[test]
fn test_predicate_policy() {
    let policy = MatchPolicy::<HitMessage>::predicate(|msg| msg.contains("en=purchase"));
    assert_eq!(policy.kind(), PolicyKind::Predicate);
    assert!(policy.matches(&"collect?v=2&en=purchase".to_string()));
    assert!(!policy.matches(&"collect?v=2&en=page_view".to_string()));
}

#[test]
fn test_policy_kind_names() {
    assert_eq!(PolicyKind::Regex.to_string(), "regex");
    assert_eq!(PolicyKind::MatchObject.to_string(), "matchObject");
    assert_eq!(PolicyKind::MatchSchema.to_string(), "matchSchema");
    assert_eq!(PolicyKind::Predicate.to_string(), "predicate");
}
