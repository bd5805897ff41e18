//! `type` keyword: a single type name or an array of alternatives.

use super::type_name;
use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::ValidationError;

pub(crate) fn check_type(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(declared) = schema.get("type") else {
        return Vec::new();
    };
    let wanted: Vec<&str> = match declared {
        Value::String(s) => vec![s.as_str()],
        Value::Array(arr) => arr.iter().filter_map(Value::as_str).collect(),
        _ => return Vec::new(),
    };
    if wanted.iter().any(|w| matches_type(w, instance)) {
        Vec::new()
    } else {
        vec![ValidationError {
            error: format!("expected {}, found {}", wanted.join(" or "), type_name(instance)),
            instance_location: instance_location.clone(),
            keyword_location: keyword_location.join("type"),
        }]
    }
}

fn matches_type(wanted: &str, instance: &Value) -> bool {
    match wanted {
        "number" => instance.is_number(),
        "integer" => instance.as_i64().is_some() || instance.as_u64().is_some(),
        other => type_name(instance) == other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_type_accepts_integers() {
        let errors = check_type(
            &json!({"type": "number"}),
            &json!(4),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn integer_type_rejects_floats() {
        let errors = check_type(
            &json!({"type": "integer"}),
            &json!(4.5),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn array_of_types_accepts_any_match() {
        let errors = check_type(
            &json!({"type": ["string", "null"]}),
            &Value::Null,
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }
}
