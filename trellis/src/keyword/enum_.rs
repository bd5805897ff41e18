//! `enum` keyword: membership in a declared list of allowed values.

use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::ValidationError;

pub(crate) fn check_enum(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(variants) = schema.get("enum").and_then(Value::as_array) else {
        return Vec::new();
    };
    if variants.iter().any(|v| v == instance) {
        Vec::new()
    } else {
        vec![ValidationError {
            error: format!("{instance} is not one of the enum values"),
            instance_location: instance_location.clone(),
            keyword_location: keyword_location.join("enum"),
        }]
    }
}
