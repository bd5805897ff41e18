//! `additionalProperties: false`, and `properties`/`patternProperties`
//! recursion.
//!
//! A normal child already gets its own node and its own
//! [`Validate::validate`](trellis_core::Validate) call, so re-checking its
//! sub-schema here is usually redundant, except when this schema fragment
//! is itself a one-shot predicate (an `if`/`anyOf`/`oneOf` arm, or `not`'s
//! sub-schema) that never becomes a node's own effective schema. Those
//! fragments nest `properties`/`patternProperties` the way any JSON Schema
//! does, and nothing else ever checks them, so `check_properties` and
//! `check_pattern_properties` recurse here.

use trellis_core::schema::pattern_matches;
use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::{ValidateRequest, ValidationError};

/// Recurses into each declared property the instance actually has,
/// running the full keyword suite against its sub-schema.
pub(crate) fn check_properties(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(object) = instance.as_object() else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    for (key, sub) in properties {
        let Some(value) = object.get(key) else {
            continue;
        };
        let child_instance_location = instance_location.join(key.as_str());
        let child_keyword_location = keyword_location.join("properties").join(key.as_str());
        errors.extend(crate::BasicValidator.collect(&ValidateRequest {
            schema: sub,
            instance: value,
            instance_location: &child_instance_location,
            keyword_location: &child_keyword_location,
        }));
    }
    errors
}

/// Recurses into every declared `patternProperties` entry whose regex
/// matches a key the instance actually has.
pub(crate) fn check_pattern_properties(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(pattern_properties) = schema.get("patternProperties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(object) = instance.as_object() else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    for (pattern, sub) in pattern_properties {
        for (key, value) in object {
            if !pattern_matches(pattern, key) {
                continue;
            }
            let child_instance_location = instance_location.join(key.as_str());
            let child_keyword_location = keyword_location.join("patternProperties").join(pattern.as_str());
            errors.extend(crate::BasicValidator.collect(&ValidateRequest {
                schema: sub,
                instance: value,
                instance_location: &child_instance_location,
                keyword_location: &child_keyword_location,
            }));
        }
    }
    errors
}

pub(crate) fn check_object(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    if schema.get("additionalProperties") != Some(&Value::Bool(false)) {
        return Vec::new();
    }
    let Some(object) = instance.as_object() else {
        return Vec::new();
    };
    let declared = schema.get("properties").and_then(Value::as_object);
    let patterns = schema.get("patternProperties").and_then(Value::as_object);
    object
        .keys()
        .filter(|key| {
            let in_properties = declared.is_some_and(|p| p.contains_key(key.as_str()));
            let in_patterns = patterns
                .is_some_and(|p| p.keys().any(|pattern| pattern_matches(pattern, key)));
            !in_properties && !in_patterns
        })
        .map(|key| ValidationError {
            error: format!("additional property {key} is not allowed"),
            instance_location: instance_location.join(key.as_str()),
            keyword_location: keyword_location.join("additionalProperties"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn undeclared_key_is_rejected() {
        let errors = check_object(
            &json!({"properties": {"a": {}}, "additionalProperties": false}),
            &json!({"a": 1, "b": 2}),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn pattern_matched_key_is_allowed() {
        let errors = check_object(
            &json!({"patternProperties": {"^x": {}}, "additionalProperties": false}),
            &json!({"x1": 1}),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn properties_recursion_catches_a_nested_const_mismatch() {
        let errors = check_properties(
            &json!({"properties": {"plan": {"const": "team"}}}),
            &json!({"plan": "solo"}),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn properties_recursion_skips_an_absent_key() {
        let errors = check_properties(
            &json!({"properties": {"plan": {"const": "team"}}}),
            &json!({}),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn pattern_properties_recursion_catches_a_matched_key_mismatch() {
        let errors = check_pattern_properties(
            &json!({"patternProperties": {"^x": {"type": "number"}}}),
            &json!({"x1": "not a number"}),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn pattern_properties_recursion_skips_unmatched_keys() {
        let errors = check_pattern_properties(
            &json!({"patternProperties": {"^x": {"type": "number"}}}),
            &json!({"y1": "fine, pattern doesn't apply"}),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }
}
