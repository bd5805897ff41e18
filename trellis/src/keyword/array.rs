//! `minItems`/`maxItems`, plus `prefixItems`/`items` recursion.
//!
//! A normal array element already gets its own node and its own
//! [`Validate::validate`](trellis_core::Validate) call, so re-checking it
//! here is usually redundant, except when this schema fragment is a
//! one-shot predicate (an `if`/`anyOf`/`oneOf` arm, or `not`'s sub-schema)
//! that never becomes a node's own effective schema.

use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::{ValidateRequest, ValidationError};

/// Recurses into `prefixItems` positions and, for indices beyond them,
/// the trailing `items` schema.
pub(crate) fn check_items(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(array) = instance.as_array() else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    let prefix_items = schema.get("prefixItems").and_then(Value::as_array);
    if let Some(prefix_items) = prefix_items {
        for (index, sub) in prefix_items.iter().enumerate() {
            let Some(value) = array.get(index) else {
                continue;
            };
            let child_instance_location = instance_location.join(index);
            let child_keyword_location = keyword_location.join("prefixItems").join(index);
            errors.extend(crate::BasicValidator.collect(&ValidateRequest {
                schema: sub,
                instance: value,
                instance_location: &child_instance_location,
                keyword_location: &child_keyword_location,
            }));
        }
    }
    if let Some(items_schema) = schema.get("items") {
        let start = prefix_items.map_or(0, Vec::len);
        for (index, value) in array.iter().enumerate().skip(start) {
            let child_instance_location = instance_location.join(index);
            let child_keyword_location = keyword_location.join("items");
            errors.extend(crate::BasicValidator.collect(&ValidateRequest {
                schema: items_schema,
                instance: value,
                instance_location: &child_instance_location,
                keyword_location: &child_keyword_location,
            }));
        }
    }
    errors
}

pub(crate) fn check_array(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(array) = instance.as_array() else {
        return Vec::new();
    };
    let len = array.len();
    let mut errors = Vec::new();
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if (len as u64) < min {
            errors.push(ValidationError {
                error: format!("array has {len} items, fewer than minItems {min}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("minItems"),
            });
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if (len as u64) > max {
            errors.push(ValidationError {
                error: format!("array has {len} items, more than maxItems {max}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("maxItems"),
            });
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn too_few_items_is_reported() {
        let errors = check_array(
            &json!({"minItems": 2}),
            &json!([1]),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn items_recursion_checks_past_the_prefix() {
        let errors = check_items(
            &json!({"prefixItems": [{"type": "string"}], "items": {"type": "number"}}),
            &json!(["a", 1, "oops"]),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }
}
