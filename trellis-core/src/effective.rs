//! Effective-schema resolver (C5): evaluates `allOf`/`if-then-else`/
//! `anyOf`/`oneOf`/`dependentSchemas` against the current instance value
//! and returns the resolved type, effective schema, and validation
//! output for a single node.
//!
//! Merge order when more than one composition keyword is present at the
//! same level (Open Question 4, resolved): `allOf` first, then `anyOf`,
//! then `if`/`then`/`else`, each depth-first.

use crate::schema::{
    ALL_OF, ANY_OF, DEPENDENT_SCHEMAS, ELSE, IF, MAXIMUM, MAX_LENGTH, MINIMUM, MIN_LENGTH, ONE_OF,
    PATTERN_PROPERTIES, PROPERTIES, REQUIRED, THEN, TYPE,
};
use crate::validate::{Validate, ValidateRequest, ValidationOutput};
use serde_json::{Map, Value};
use trellis_pointer::PointerBuf;

/// The outcome of resolving a node's effective schema.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Resolved primitive type.
    pub type_: String,
    /// The effective schema, after applying every conditional construct.
    pub effective_schema: Value,
    /// Validation/anomaly output, absent iff valid (or skipped because the
    /// instance value is undefined).
    pub error: Option<ValidationOutput>,
}

/// Resolves a node's effective schema and type against `value` (`None` for
/// a declared-but-absent optional property).
#[must_use]
pub fn resolve(
    schema: &Value,
    value: Option<&Value>,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
    validator: &dyn Validate,
) -> Resolved {
    let probe = value.unwrap_or(&Value::Null);
    let mut anomalies = Vec::new();
    let effective = resolve_value(schema, probe, instance_location, validator, &mut anomalies);
    let (type_, mut error) = resolve_type(&effective, value, instance_location, keyword_location);

    if let Some(value) = value {
        let outcome = validator.validate(ValidateRequest {
            schema: &effective,
            instance: value,
            instance_location,
            keyword_location,
        });
        if !outcome.valid {
            error = Some(fold(error, outcome));
        }
    }
    if !anomalies.is_empty() {
        let anomaly_output =
            ValidationOutput::from_messages(anomalies, instance_location.clone(), keyword_location.clone());
        error = Some(fold(error, anomaly_output));
    }
    Resolved {
        type_,
        effective_schema: effective,
        error,
    }
}

fn fold(existing: Option<ValidationOutput>, addition: ValidationOutput) -> ValidationOutput {
    match existing {
        Some(mut output) => {
            output.merge(addition);
            output
        }
        None => addition,
    }
}

/// Resolves `schema`'s effective form against `value`, without touching
/// type resolution or the final validator call. Those only happen once,
/// at the top of [`resolve`]. Recurses for nested compositions.
fn resolve_value(
    schema: &Value,
    value: &Value,
    location: &PointerBuf,
    validator: &dyn Validate,
    anomalies: &mut Vec<String>,
) -> Value {
    let Value::Object(base) = schema else {
        // a boolean schema has nothing to compose against.
        return schema.clone();
    };
    let mut acc = base.clone();

    if let Some(Value::Array(arms)) = acc.get(ALL_OF).cloned() {
        for arm in &arms {
            let resolved = resolve_value(arm, value, location, validator, anomalies);
            merge_into(&mut acc, &resolved);
        }
    }

    if let Some(Value::Array(arms)) = acc.get(ANY_OF).cloned() {
        for arm in &arms {
            if predicate_holds(arm.get(IF), value, location, validator) {
                let resolved = resolve_value(arm, value, location, validator, anomalies);
                merge_into(&mut acc, &resolved);
            }
        }
    }

    if let Some(if_schema) = acc.get(IF).cloned() {
        let branch = if predicate_holds(Some(&if_schema), value, location, validator) {
            acc.get(THEN).cloned()
        } else {
            acc.get(ELSE).cloned()
        };
        if let Some(branch_schema) = branch {
            let resolved = resolve_value(&branch_schema, value, location, validator, anomalies);
            merge_into(&mut acc, &resolved);
        }
    }

    if let Some(Value::Array(arms)) = acc.get(ONE_OF).cloned() {
        resolve_one_of(&arms, value, location, validator, anomalies, &mut acc);
    }

    if let Some(Value::Object(dependent_schemas)) = acc.get(DEPENDENT_SCHEMAS).cloned() {
        if let Some(object) = value.as_object() {
            for (key, sub) in &dependent_schemas {
                if object.contains_key(key) {
                    let resolved = resolve_value(sub, value, location, validator, anomalies);
                    merge_into(&mut acc, &resolved);
                }
            }
        }
    }

    Value::Object(acc)
}

fn resolve_one_of(
    arms: &[Value],
    value: &Value,
    location: &PointerBuf,
    validator: &dyn Validate,
    anomalies: &mut Vec<String>,
    acc: &mut Map<String, Value>,
) {
    let mut matches = Vec::new();
    for arm in arms {
        let resolved = resolve_value(arm, value, location, validator, anomalies);
        let outcome = validator.validate(ValidateRequest {
            schema: &resolved,
            instance: value,
            instance_location: location,
            keyword_location: location,
        });
        if outcome.valid {
            matches.push(resolved);
        }
    }
    match matches.len() {
        0 => {}
        1 => merge_into(acc, &matches.remove(0)),
        _ => {
            // Open Question 1, resolved: raise a schema anomaly and
            // deterministically merge the first matching arm rather than
            // leaving the node's effective schema unresolved.
            anomalies.push("oneOf matched more than one arm".to_string());
            merge_into(acc, &matches.remove(0));
        }
    }
}

fn predicate_holds(
    if_schema: Option<&Value>,
    value: &Value,
    location: &PointerBuf,
    validator: &dyn Validate,
) -> bool {
    let Some(if_schema) = if_schema else {
        return true;
    };
    validator
        .validate(ValidateRequest {
            schema: if_schema,
            instance: value,
            instance_location: location,
            keyword_location: location,
        })
        .valid
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                                  Merge                                   ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Merges `other` into `acc` per §4.5's merge rules. Not commutative: the
/// later-merged branch refines the earlier one, except for the min/max
/// clamps, which are the one true-lattice exception.
fn merge_into(acc: &mut Map<String, Value>, other: &Value) {
    let Some(other) = other.as_object() else {
        return;
    };
    for (key, value) in other {
        match key.as_str() {
            REQUIRED => union_string_array(acc, key, value),
            "enum" => union_value_array(acc, key, value),
            PROPERTIES | PATTERN_PROPERTIES => merge_schema_map(acc, key, value),
            ALL_OF | ANY_OF | ONE_OF => concat_array(acc, key, value),
            MINIMUM | MIN_LENGTH => take_extreme(acc, key, value, Extreme::Max),
            MAXIMUM | MAX_LENGTH => take_extreme(acc, key, value, Extreme::Min),
            _ => {
                acc.insert(key.clone(), value.clone());
            }
        }
    }
}

fn union_string_array(acc: &mut Map<String, Value>, key: &str, value: &Value) {
    let Some(incoming) = value.as_array() else { return };
    let mut existing: Vec<Value> = acc
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for item in incoming {
        if !existing.contains(item) {
            existing.push(item.clone());
        }
    }
    acc.insert(key.to_string(), Value::Array(existing));
}

fn union_value_array(acc: &mut Map<String, Value>, key: &str, value: &Value) {
    union_string_array(acc, key, value);
}

fn concat_array(acc: &mut Map<String, Value>, key: &str, value: &Value) {
    let Some(incoming) = value.as_array() else { return };
    let mut existing: Vec<Value> = acc
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    existing.extend(incoming.iter().cloned());
    acc.insert(key.to_string(), Value::Array(existing));
}

fn merge_schema_map(acc: &mut Map<String, Value>, key: &str, value: &Value) {
    let Some(incoming) = value.as_object() else { return };
    let mut existing = acc
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for (prop_key, prop_value) in incoming {
        match (existing.get(prop_key).cloned(), prop_value) {
            (Some(Value::Object(mut existing_sub)), Value::Object(_)) => {
                merge_into(&mut existing_sub, prop_value);
                existing.insert(prop_key.clone(), Value::Object(existing_sub));
            }
            _ => {
                existing.insert(prop_key.clone(), prop_value.clone());
            }
        }
    }
    acc.insert(key.to_string(), Value::Object(existing));
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

fn take_extreme(acc: &mut Map<String, Value>, key: &str, value: &Value, extreme: Extreme) {
    let Some(incoming) = value.as_f64() else {
        acc.insert(key.to_string(), value.clone());
        return;
    };
    let existing = acc.get(key).and_then(Value::as_f64);
    let keep_incoming = match existing {
        None => true,
        Some(current) => match extreme {
            Extreme::Max => incoming > current,
            Extreme::Min => incoming < current,
        },
    };
    if keep_incoming {
        acc.insert(key.to_string(), value.clone());
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                              Type resolution                            ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn resolve_type(
    effective: &Value,
    value: Option<&Value>,
    instance_location: &PointerBuf,
    keyword_location: &PointerBuf,
) -> (String, Option<ValidationOutput>) {
    let declared = declared_type(effective);
    match (declared, value) {
        (Some(declared), Some(value)) => {
            if value_matches(&declared, value) {
                (declared, None)
            } else {
                let output = ValidationOutput::from_messages(
                    vec![format!("must be {declared}")],
                    instance_location.clone(),
                    keyword_location.clone(),
                );
                (declared, Some(output))
            }
        }
        (Some(declared), None) => (declared, None),
        (None, Some(value)) => (infer_type(value), None),
        (None, None) => ("null".to_string(), None),
    }
}

fn declared_type(schema: &Value) -> Option<String> {
    match schema.get(TYPE) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(arr)) => arr.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn infer_type(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

fn value_matches(declared: &str, value: &Value) -> bool {
    match declared {
        "integer" => value.as_f64().is_some_and(|f| f.fract() == 0.0),
        "number" => value.is_number(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidateRequest;

    /// A minimal stand-in validator for these unit tests: treats every
    /// schema as an independent set of keyword checks covering just
    /// `const` and `type`, enough to drive `if`/`then`/`else` predicates.
    struct Stub;
    impl Validate for Stub {
        fn validate(&self, request: ValidateRequest<'_>) -> ValidationOutput {
            let schema = request.schema;
            let mut valid = true;
            if let Some(expected) = schema.get("const") {
                valid &= expected == request.instance;
            }
            if let Some(Value::Object(properties)) = schema.get(PROPERTIES) {
                if let Some(object) = request.instance.as_object() {
                    for (key, sub) in properties {
                        if let Some(v) = object.get(key) {
                            if let Some(expected) = sub.get("const") {
                                valid &= expected == v;
                            }
                        }
                    }
                }
            }
            ValidationOutput {
                valid,
                errors: Vec::new(),
                error: None,
            }
        }
    }

    #[test]
    fn if_then_else_switches_effective_schema() {
        let schema = serde_json::json!({
            "if": {"properties": {"val": {"const": 1}}},
            "then": {"properties": {"dependent": {"type": "string"}}},
            "else": {"properties": {"dependent": {"type": "number"}}}
        });
        let value = serde_json::json!({"val": 1, "dependent": "foo"});
        let resolved = resolve(
            &schema,
            Some(&value),
            &PointerBuf::root(),
            &PointerBuf::root(),
            &Stub,
        );
        assert_eq!(
            resolved.effective_schema["properties"]["dependent"]["type"],
            serde_json::json!("string")
        );

        let value2 = serde_json::json!({"val": 2, "dependent": 5});
        let resolved2 = resolve(
            &schema,
            Some(&value2),
            &PointerBuf::root(),
            &PointerBuf::root(),
            &Stub,
        );
        assert_eq!(
            resolved2.effective_schema["properties"]["dependent"]["type"],
            serde_json::json!("number")
        );
    }

    #[test]
    fn any_of_merges_every_vacuously_true_arm() {
        let schema = serde_json::json!({
            "anyOf": [
                {"if": {"properties": {"x": {"const": true}}}, "then": {"properties": {"result": {"description": "Desc X"}}}},
                {"if": {"properties": {"y": {"const": true}}}, "then": {"properties": {"result": {"title": "Title Y"}}}}
            ]
        });
        let value = serde_json::json!({"x": true, "y": true, "result": "v"});
        let resolved = resolve(
            &schema,
            Some(&value),
            &PointerBuf::root(),
            &PointerBuf::root(),
            &Stub,
        );
        let result_schema = &resolved.effective_schema["properties"]["result"];
        assert_eq!(result_schema["description"], serde_json::json!("Desc X"));
        assert_eq!(result_schema["title"], serde_json::json!("Title Y"));
    }

    #[test]
    fn type_mismatch_retains_declared_type_and_errors() {
        let schema = serde_json::json!({"type": "string"});
        let value = serde_json::json!(5);
        let resolved = resolve(
            &schema,
            Some(&value),
            &PointerBuf::root(),
            &PointerBuf::root(),
            &Stub,
        );
        assert_eq!(resolved.type_, "string");
        assert!(resolved.error.is_some());
    }

    #[test]
    fn min_max_clamp_across_all_of_arms() {
        let schema = serde_json::json!({
            "allOf": [{"minimum": 1}, {"minimum": 5}, {"maximum": 10}, {"maximum": 3}]
        });
        let value = serde_json::json!(4);
        let resolved = resolve(
            &schema,
            Some(&value),
            &PointerBuf::root(),
            &PointerBuf::root(),
            &Stub,
        );
        assert_eq!(resolved.effective_schema[MINIMUM], serde_json::json!(5));
        assert_eq!(resolved.effective_schema[MAXIMUM], serde_json::json!(3));
    }

    /// Panics with a line-oriented diff rather than a plain `!=`, so a
    /// mismatch in a large merged schema is actually readable.
    fn assert_schema_eq(actual: &Value, expected: &Value) {
        if actual == expected {
            return;
        }
        let actual_pretty = serde_json::to_string_pretty(actual).unwrap();
        let expected_pretty = serde_json::to_string_pretty(expected).unwrap();
        let diff = similar::TextDiff::from_lines(&expected_pretty, &actual_pretty);
        let mut rendered = String::new();
        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => " ",
            };
            use std::fmt::Write as _;
            write!(rendered, "{sign}{change}").unwrap();
        }
        panic!("effective schema did not match (expected vs. actual):\n{rendered}");
    }

    #[test]
    fn all_of_and_one_of_compose_into_the_expected_whole_schema() {
        let schema = serde_json::json!({
            "type": "object",
            "allOf": [{"required": ["id"]}],
            "oneOf": [{"properties": {"kind": {"const": "a"}}}]
        });
        let value = serde_json::json!({"id": 1, "kind": "a"});
        let resolved = resolve(
            &schema,
            Some(&value),
            &PointerBuf::root(),
            &PointerBuf::root(),
            &Stub,
        );
        // the raw `allOf`/`oneOf` arrays stay in the effective schema
        // alongside what they resolved into. `resolve_value` merges
        // composition results into the accumulator, it never strips the
        // keywords that produced them.
        assert_schema_eq(
            &resolved.effective_schema,
            &serde_json::json!({
                "type": "object",
                "allOf": [{"required": ["id"]}],
                "oneOf": [{"properties": {"kind": {"const": "a"}}}],
                "required": ["id"],
                "properties": {"kind": {"const": "a"}}
            }),
        );
    }
}
