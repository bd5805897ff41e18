//! Schema utilities (C2): the recognized keyword dialect (§6.1),
//! `$ref` dereferencing, and sub-schema selection for a child key.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use trellis_pointer::PointerBuf;

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                              Keyword names                              ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

pub const TYPE: &str = "type";
pub const PROPERTIES: &str = "properties";
pub const PATTERN_PROPERTIES: &str = "patternProperties";
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";
pub const REQUIRED: &str = "required";
pub const ITEMS: &str = "items";
pub const PREFIX_ITEMS: &str = "prefixItems";
pub const ENUM: &str = "enum";
pub const CONST: &str = "const";
pub const DEFAULT: &str = "default";
pub const IF: &str = "if";
pub const THEN: &str = "then";
pub const ELSE: &str = "else";
pub const ALL_OF: &str = "allOf";
pub const ANY_OF: &str = "anyOf";
pub const ONE_OF: &str = "oneOf";
pub const NOT: &str = "not";
pub const DEPENDENT_REQUIRED: &str = "dependentRequired";
pub const DEPENDENT_SCHEMAS: &str = "dependentSchemas";
pub const REF: &str = "$ref";
pub const DEFS: &str = "$defs";
pub const DEFINITIONS: &str = "definitions";
pub const MINIMUM: &str = "minimum";
pub const MAXIMUM: &str = "maximum";
pub const MIN_LENGTH: &str = "minLength";
pub const MAX_LENGTH: &str = "maxLength";
pub const MIN_ITEMS: &str = "minItems";
pub const MAX_ITEMS: &str = "maxItems";

/// Keywords whose value is itself a sub-schema map (`key -> schema`).
const SCHEMA_MAPS: &[&str] = &[PROPERTIES, PATTERN_PROPERTIES, DEFS, DEFINITIONS, "dependentSchemas"];
/// Keywords whose value is a single sub-schema.
const SCHEMA_SINGLES: &[&str] = &[ITEMS, ADDITIONAL_PROPERTIES, IF, THEN, ELSE, NOT];
/// Keywords whose value is an array of sub-schemas.
const SCHEMA_ARRAYS: &[&str] = &[PREFIX_ITEMS, ALL_OF, ANY_OF, ONE_OF];

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                             Dereferencing                                ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Walks `root` once, replacing every `$ref` with a deep clone of the
/// sub-schema it resolves to (resolved against `root` itself, only
/// same-document `#/...` references are supported).
///
/// A `$ref` cycle is broken by leaving the innermost re-occurrence as an
/// empty schema (Open Question 2, resolved: left empty rather than
/// rejected at construction, matching the teacher's own ambiguity note).
/// A `$ref` that cannot be resolved is likewise left as an empty schema.
#[must_use]
pub fn dereference(root: &Value) -> Value {
    let mut stack = Vec::new();
    deref_value(root, root, &mut stack)
}

fn deref_value(node: &Value, root: &Value, stack: &mut Vec<String>) -> Value {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get(REF) {
                return deref_ref(reference, root, stack);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), deref_field(key, value, root, stack));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn deref_ref(reference: &str, root: &Value, stack: &mut Vec<String>) -> Value {
    let Some(ptr_str) = reference.strip_prefix('#') else {
        // only same-document references are in the supported dialect.
        return Value::Object(Map::new());
    };
    if stack.iter().any(|s| s == ptr_str) {
        return Value::Object(Map::new());
    }
    let Ok(ptr) = PointerBuf::parse(ptr_str) else {
        return Value::Object(Map::new());
    };
    let Some(target) = trellis_pointer::get(root, &ptr) else {
        return Value::Object(Map::new());
    };
    stack.push(ptr_str.to_string());
    let resolved = deref_value(target, root, stack);
    stack.pop();
    resolved
}

fn deref_field(key: &str, value: &Value, root: &Value, stack: &mut Vec<String>) -> Value {
    if SCHEMA_MAPS.contains(&key) {
        if let Value::Object(map) = value {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), deref_value(v, root, stack));
            }
            return Value::Object(out);
        }
    } else if SCHEMA_SINGLES.contains(&key) {
        return deref_value(value, root, stack);
    } else if SCHEMA_ARRAYS.contains(&key) {
        if let Value::Array(arr) = value {
            return Value::Array(arr.iter().map(|v| deref_value(v, root, stack)).collect());
        }
    }
    value.clone()
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                          Sub-schema selection                           ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// A key identifying a prospective child of an object/array instance,
/// independent of whether a value is currently present there.
#[derive(Debug, Clone)]
pub enum ChildKey<'a> {
    /// An array index.
    Index(usize),
    /// An object property name.
    Property(&'a str),
}

/// The sub-schema selected for a child key, along with the keyword
/// location (relative to the parent schema) it was found at.
#[derive(Debug, Clone)]
pub struct Selected {
    /// The sub-schema fragment.
    pub schema: Value,
    /// Whether a node built from this fragment may be removed by the
    /// caller (`items`/`patternProperties`/`additionalProperties`), as
    /// opposed to a declared `properties` entry or `prefixItems` position.
    pub can_remove: bool,
    /// Keyword location, relative to `parent`.
    pub keyword_location: PointerBuf,
}

/// Selects the most specific applicable sub-schema for child key `key` on
/// parent schema `schema`, per §4.2. Returns `None` when no keyword makes
/// `key` addressable (the caller may not add a child there).
#[must_use]
pub fn select_child(schema: &Value, key: &ChildKey<'_>) -> Option<Selected> {
    match key {
        ChildKey::Index(index) => select_index(schema, *index),
        ChildKey::Property(name) => select_property(schema, name),
    }
}

fn select_index(schema: &Value, index: usize) -> Option<Selected> {
    if let Some(prefix_items) = schema.get(PREFIX_ITEMS).and_then(Value::as_array) {
        if let Some(sub) = prefix_items.get(index) {
            return Some(Selected {
                schema: sub.clone(),
                can_remove: false,
                keyword_location: PointerBuf::root()
                    .join(PREFIX_ITEMS)
                    .join(index.to_string()),
            });
        }
    }
    schema.get(ITEMS).map(|items| Selected {
        schema: items.clone(),
        can_remove: true,
        keyword_location: PointerBuf::root().join(ITEMS),
    })
}

fn select_property(schema: &Value, name: &str) -> Option<Selected> {
    if let Some(sub) = schema.get(PROPERTIES).and_then(Value::as_object).and_then(|m| m.get(name))
    {
        return Some(Selected {
            schema: sub.clone(),
            can_remove: false,
            keyword_location: PointerBuf::root().join(PROPERTIES).join(name),
        });
    }
    if let Some(pattern_properties) = schema.get(PATTERN_PROPERTIES).and_then(Value::as_object) {
        if let Some((pattern, sub)) = first_pattern_match(pattern_properties, name) {
            return Some(Selected {
                schema: sub.clone(),
                can_remove: true,
                keyword_location: PointerBuf::root()
                    .join(PATTERN_PROPERTIES)
                    .join(pattern.clone()),
            });
        }
    }
    match schema.get(ADDITIONAL_PROPERTIES) {
        Some(Value::Bool(false)) | None => None,
        Some(sub) => Some(Selected {
            schema: sub.clone(),
            can_remove: true,
            keyword_location: PointerBuf::root().join(ADDITIONAL_PROPERTIES),
        }),
    }
}

fn first_pattern_match<'m>(
    pattern_properties: &'m Map<String, Value>,
    key: &str,
) -> Option<(&'m String, &'m Value)> {
    pattern_properties
        .iter()
        .find(|(pattern, _)| pattern_matches(pattern, key))
}

/// True if `key` matches ECMAScript-flavor regex `pattern`. Matches are
/// cached since schemas are re-checked against every instance key on every
/// reconciliation.
#[must_use]
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    static CACHE: Lazy<Mutex<HashMap<String, Option<fancy_regex::Regex>>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));
    let mut cache = CACHE.lock().unwrap();
    let compiled = cache
        .entry(pattern.to_string())
        .or_insert_with(|| fancy_regex::Regex::new(pattern).ok());
    compiled
        .as_ref()
        .is_some_and(|re| re.is_match(key).unwrap_or(false))
}

/// Returns `schema`'s declared `required` property names, if any.
#[must_use]
pub fn required_of(schema: &Value) -> Vec<String> {
    schema
        .get(REQUIRED)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// True if `schema` behaves as a JSON Schema in its own right: an object,
/// or one of the two boolean schema forms (`true` always matches, `false`
/// never does).
#[must_use]
pub fn is_schema(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Bool(_))
}
