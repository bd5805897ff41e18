//! `required` keyword: every listed property name must be present on an
//! object instance. Silent on a non-object instance; that mismatch is
//! `type`'s job to report.

use serde_json::Value;
use trellis_pointer::PointerBuf;
use trellis_core::validate::ValidationError;

pub(crate) fn check_required(
    schema: &Value,
    instance: &Value,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> Vec<ValidationError> {
    let Some(object) = instance.as_object() else {
        return Vec::new();
    };
    trellis_core::schema::required_of(schema)
        .into_iter()
        .filter(|name| !object.contains_key(name))
        .map(|name| ValidationError {
            error: format!("missing required property {name}"),
            instance_location: instance_location.clone(),
            keyword_location: keyword_location.join("required"),
        })
        .collect()
}
