//! `minimum`/`maximum`/`exclusiveMinimum`/`exclusiveMaximum`/`multipleOf`
//! keywords.

use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::ValidationError;

pub(crate) fn check_numeric(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(n) = instance.as_f64() else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
        if n < minimum {
            errors.push(ValidationError {
                error: format!("{n} is less than the minimum of {minimum}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("minimum"),
            });
        }
    }
    if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
        if n > maximum {
            errors.push(ValidationError {
                error: format!("{n} is greater than the maximum of {maximum}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("maximum"),
            });
        }
    }
    if let Some(exclusive_minimum) = schema.get("exclusiveMinimum").and_then(Value::as_f64) {
        if n <= exclusive_minimum {
            errors.push(ValidationError {
                error: format!("{n} is not greater than the exclusive minimum of {exclusive_minimum}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("exclusiveMinimum"),
            });
        }
    }
    if let Some(exclusive_maximum) = schema.get("exclusiveMaximum").and_then(Value::as_f64) {
        if n >= exclusive_maximum {
            errors.push(ValidationError {
                error: format!("{n} is not less than the exclusive maximum of {exclusive_maximum}"),
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.join("exclusiveMaximum"),
            });
        }
    }
    if let Some(multiple_of) = schema.get("multipleOf").and_then(Value::as_f64) {
        if multiple_of > 0.0 {
            let quotient = n / multiple_of;
            if (quotient - quotient.round()).abs() > f64::EPSILON {
                errors.push(ValidationError {
                    error: format!("{n} is not a multiple of {multiple_of}"),
                    instance_location: instance_location.clone(),
                    keyword_location: keyword_location.join("multipleOf"),
                });
            }
        }
    }
    errors
}
