//! `const` keyword: exact equality with a single declared value.

use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::ValidationError;

pub(crate) fn check_const(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(expected) = schema.get("const") else {
        return Vec::new();
    };
    if expected == instance {
        Vec::new()
    } else {
        vec![ValidationError {
            error: format!("expected const {expected}, found {instance}"),
            instance_location: instance_location.clone(),
            keyword_location: keyword_location.join("const"),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mismatch_is_reported() {
        let errors = check_const(
            &json!({"const": 7}),
            &json!(8),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn match_is_silent() {
        let errors = check_const(
            &json!({"const": "x"}),
            &json!("x"),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }
}
