//! `minLength`/`maxLength` keywords, counted in Unicode scalar values, plus
//! `pattern`.

use trellis_core::schema::pattern_matches;
use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::ValidationError;

pub(crate) fn check_string(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(s) = instance.as_str() else {
        return Vec::new();
    };
    let len = s.chars().count();
    let mut errors = Vec::new();
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if (len as u64) < min {
            errors.push(ValidationError {
                error: format!("length {len} is less than minLength {min}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("minLength"),
            });
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if (len as u64) > max {
            errors.push(ValidationError {
                error: format!("length {len} is greater than maxLength {max}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("maxLength"),
            });
        }
    }
    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        if !pattern_matches(pattern, s) {
            errors.push(ValidationError {
                error: format!("{s:?} does not match pattern {pattern:?}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("pattern"),
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
    fn too_short_is_reported() {
        let errors = check_string(
            &json!({"minLength": 3}),
            &json!("ab"),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn too_long_is_reported() {
        let errors = check_string(
            &json!({"maxLength": 2}),
            &json!("abc"),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn pattern_mismatch_is_reported() {
        let errors = check_string(
            &json!({"pattern": "^[a-z]+$"}),
            &json!("Abc"),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn pattern_match_is_silent() {
        let errors = check_string(
            &json!({"pattern": "^[a-z]+$"}),
            &json!("abc"),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }
}
