//! Default generator (C3): a pure function from a schema fragment (and an
//! optional existing value) to a default value, under one of three fill
//! strategies.

use crate::schema::{CONST, DEFAULT, PREFIX_ITEMS, PROPERTIES, REQUIRED, TYPE};
use serde_json::{Map, Value};

/// Controls how aggressively [`generate`] synthesizes values that the
/// schema doesn't explicitly declare a default for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillStrategy {
    /// `const`/`default` win when present; otherwise recurse only into
    /// `required` properties and `prefixItems` positions. Never
    /// materializes an empty object/array solely to carry nested
    /// defaults.
    #[default]
    Explicit,
    /// As `Explicit`, plus synthesizes typed defaults (`""`, `0`, `false`,
    /// `null`, `{}`, `[]`) even for properties that aren't required.
    Always,
    /// Never synthesizes anything; only merges defaults into an existing
    /// value's missing keys (and produces nothing from a bare schema).
    Never,
}

/// Produces a default value for `schema`, merging into `existing` when
/// supplied. Returns `None` when no default applies and there is no
/// existing value to fall back to.
#[must_use]
pub fn generate(schema: &Value, existing: Option<&Value>, strategy: FillStrategy) -> Option<Value> {
    match (existing, strategy) {
        (Some(value), FillStrategy::Never) => Some(value.clone()),
        (None, FillStrategy::Never) => None,
        (Some(value), _) => Some(merge(schema, value.clone(), strategy)),
        (None, _) => build(schema, strategy),
    }
}

fn build(schema: &Value, strategy: FillStrategy) -> Option<Value> {
    if let Some(constant) = schema.get(CONST) {
        return Some(constant.clone());
    }
    if let Some(default) = schema.get(DEFAULT) {
        return Some(default.clone());
    }
    match strategy {
        FillStrategy::Never => None,
        FillStrategy::Explicit => build_required_only(schema, strategy),
        FillStrategy::Always => Some(build_typed(schema, strategy)),
    }
}

/// `Explicit`: recurse into `required` properties and `prefixItems`
/// positions, but only materialize a container when that recursion
/// actually produced something.
fn build_required_only(schema: &Value, strategy: FillStrategy) -> Option<Value> {
    let required = crate::schema::required_of(schema);
    if !required.is_empty() {
        if let Some(properties) = schema.get(PROPERTIES).and_then(Value::as_object) {
            let mut object = Map::new();
            for key in &required {
                if let Some(sub) = properties.get(key) {
                    if let Some(value) = build_required_value(sub, strategy) {
                        object.insert(key.clone(), value);
                    }
                }
            }
            if !object.is_empty() {
                return Some(Value::Object(object));
            }
        }
    }
    if let Some(prefix_items) = schema.get(PREFIX_ITEMS).and_then(Value::as_array) {
        let built: Vec<Option<Value>> = prefix_items
            .iter()
            .map(|sub| build_required_value(sub, strategy))
            .collect();
        if built.iter().any(Option::is_some) {
            return Some(Value::Array(
                built.into_iter().map(|v| v.unwrap_or(Value::Null)).collect(),
            ));
        }
    }
    None
}

/// The value a required property/positional entry gets under `Explicit`:
/// its own `const`/`default` if declared; a recursively-built container
/// only if that recursion actually produces something (never a bare
/// `{}`/`[]`); otherwise a synthesized typed default, since being required
/// leaves no room for "absent" the way an optional property has.
fn build_required_value(schema: &Value, strategy: FillStrategy) -> Option<Value> {
    if let Some(constant) = schema.get(CONST) {
        return Some(constant.clone());
    }
    if let Some(default) = schema.get(DEFAULT) {
        return Some(default.clone());
    }
    match declared_type(schema).as_deref() {
        Some("object" | "array") => build_required_only(schema, strategy),
        _ => Some(build_typed(schema, strategy)),
    }
}

/// `Always`: synthesize a typed default regardless of `required`.
fn build_typed(schema: &Value, strategy: FillStrategy) -> Value {
    match declared_type(schema).as_deref() {
        Some("string") => Value::String(String::new()),
        Some("number" | "integer") => Value::Number(0.into()),
        Some("boolean") => Value::Bool(false),
        Some("null") => Value::Null,
        Some("object") => {
            let mut object = Map::new();
            if let Some(properties) = schema.get(PROPERTIES).and_then(Value::as_object) {
                for (key, sub) in properties {
                    if let Some(value) = build(sub, strategy) {
                        object.insert(key.clone(), value);
                    }
                }
            }
            Value::Object(object)
        }
        Some("array") => {
            let mut array = Vec::new();
            if let Some(prefix_items) = schema.get(PREFIX_ITEMS).and_then(Value::as_array) {
                for sub in prefix_items {
                    array.push(build(sub, strategy).unwrap_or(Value::Null));
                }
            }
            Value::Array(array)
        }
        _ => Value::Null,
    }
}

fn declared_type(schema: &Value) -> Option<String> {
    match schema.get(TYPE) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(arr)) => arr.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Merges defaults into `value`'s missing keys/positions without
/// overwriting anything present. A type mismatch between `value` and
/// `schema`'s declared type is preserved as-is: the caller's value wins.
fn merge(schema: &Value, value: Value, strategy: FillStrategy) -> Value {
    match value {
        Value::Object(mut object) => {
            if let Some(properties) = schema.get(PROPERTIES).and_then(Value::as_object) {
                let required = crate::schema::required_of(schema);
                for (key, sub) in properties {
                    let should_fill =
                        strategy == FillStrategy::Always || required.iter().any(|r| r == key);
                    match object.remove(key) {
                        Some(existing) => {
                            object.insert(key.clone(), merge(sub, existing, strategy));
                        }
                        None if strategy != FillStrategy::Never && should_fill => {
                            if let Some(value) = build(sub, strategy) {
                                object.insert(key.clone(), value);
                            }
                        }
                        None => {}
                    }
                }
            }
            Value::Object(object)
        }
        Value::Array(mut array) => {
            if let Some(prefix_items) = schema.get(PREFIX_ITEMS).and_then(Value::as_array) {
                for (index, sub) in prefix_items.iter().enumerate() {
                    if index < array.len() {
                        let existing = std::mem::replace(&mut array[index], Value::Null);
                        array[index] = merge(sub, existing, strategy);
                    } else if let Some(value) = build(sub, strategy) {
                        array.push(value);
                    }
                }
            }
            Value::Array(array)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "status": {"type": "string", "default": "pending"},
                "tags": {"type": "array", "items": {"type": "string"}, "default": ["x"]},
                "priority": {"type": "number", "default": 0}
            },
            "required": ["title", "status", "tags"]
        })
    }

    #[test]
    fn explicit_only_fills_required() {
        let result = generate(&schema(), None, FillStrategy::Explicit).unwrap();
        assert_eq!(
            result,
            json!({"title": "", "status": "pending", "tags": ["x"]})
        );
    }

    #[test]
    fn explicit_does_not_materialize_empty_object() {
        let schema = json!({"type": "object", "properties": {"x": {"type": "string"}}});
        assert_eq!(generate(&schema, None, FillStrategy::Explicit), None);
    }

    #[test]
    fn always_synthesizes_non_required_fields() {
        let result = generate(&schema(), None, FillStrategy::Always).unwrap();
        assert_eq!(result["priority"], json!(0));
    }

    #[test]
    fn never_returns_none_without_existing_value() {
        assert_eq!(generate(&schema(), None, FillStrategy::Never), None);
    }

    #[test]
    fn merge_preserves_present_keys_and_value_kind_mismatch() {
        let existing = json!({"title": "already set", "status": 5});
        let result = generate(&schema(), Some(&existing), FillStrategy::Explicit).unwrap();
        assert_eq!(result["title"], json!("already set"));
        assert_eq!(result["status"], json!(5));
        assert_eq!(result["tags"], json!(["x"]));
    }

    proptest! {
        /// Whatever subset of `schema()`'s declared properties an existing
        /// value already carries, `Explicit` merge must keep every one of
        /// them: a fill strategy only ever adds missing keys, never drops
        /// a caller-supplied one.
        #[test]
        fn explicit_merge_never_drops_an_existing_key(
            has_title in any::<bool>(),
            has_status in any::<bool>(),
            has_tags in any::<bool>(),
            title_value in ".{0,6}",
        ) {
            let mut object = Map::new();
            if has_title {
                object.insert("title".to_string(), json!(title_value));
            }
            if has_status {
                object.insert("status".to_string(), json!("custom"));
            }
            if has_tags {
                object.insert("tags".to_string(), json!(["present"]));
            }
            let existing = Value::Object(object.clone());
            let result = generate(&schema(), Some(&existing), FillStrategy::Explicit).unwrap();
            let result_object = result.as_object().unwrap();
            for key in object.keys() {
                prop_assert_eq!(result_object.get(key), object.get(key));
            }
        }
    }
}
