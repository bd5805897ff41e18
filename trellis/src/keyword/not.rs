//! `not` keyword: the instance must fail every check in the given
//! sub-schema. The sub-schema never gets a node of its own, so this is the
//! one keyword that re-enters the same local checks recursively.

use crate::BasicValidator;
use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::{ValidateRequest, ValidationError};

pub(crate) fn check_not(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(not_schema) = schema.get("not") else {
        return Vec::new();
    };
    let not_location = keyword_location.join("not");
    let sub_errors = BasicValidator.collect(&ValidateRequest {
        schema: not_schema,
        instance,
        instance_location,
        keyword_location: &not_location,
    });
    if sub_errors.is_empty() {
        vec![ValidationError {
            error: "instance matched the schema under not".to_string(),
            instance_location: instance_location.clone(),
            keyword_location: not_location,
        }]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matching_the_negated_schema_fails() {
        let errors = check_not(
            &json!({"not": {"type": "string"}}),
            &json!("x"),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn not_matching_is_silent() {
        let errors = check_not(
            &json!({"not": {"type": "string"}}),
            &json!(4),
            &PointerBuf::root(),
            &PointerBuf::root(),
        );
        assert!(errors.is_empty());
    }
}
