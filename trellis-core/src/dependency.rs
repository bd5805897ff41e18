//! Dependency collector (C4): enumerates the absolute instance paths a
//! schema's conditional branches read from, so the index (C8) can fire the
//! minimum necessary rebuilds on a value edit.

use crate::schema::{ALL_OF, ANY_OF, DEPENDENT_REQUIRED, DEPENDENT_SCHEMAS, ELSE, IF, ONE_OF, THEN};
use serde_json::Value;
use std::collections::HashSet;
use trellis_pointer::PointerBuf;

/// Collects the absolute instance paths `schema`'s conditional constructs
/// depend on, given that `schema` is located at `instance_location` in the
/// instance.
///
/// Does not descend into `properties`/`patternProperties`/`items`/
/// `prefixItems`/`additionalProperties`. Those produce separate
/// `FieldNode`s with their own dependency collection.
#[must_use]
pub fn collect(schema: &Value, instance_location: &PointerBuf) -> HashSet<PointerBuf> {
    let mut out = HashSet::new();
    collect_into(schema, instance_location, &mut out);
    out
}

fn collect_into(schema: &Value, loc: &PointerBuf, out: &mut HashSet<PointerBuf>) {
    let Some(schema) = schema.as_object() else {
        return;
    };
    if let Some(if_schema) = schema.get(IF) {
        collect_predicate(if_schema, loc, out);
    }
    if let Some(then_schema) = schema.get(THEN) {
        collect_into(then_schema, loc, out);
    }
    if let Some(else_schema) = schema.get(ELSE) {
        collect_into(else_schema, loc, out);
    }
    for keyword in [ALL_OF, ANY_OF, ONE_OF] {
        if let Some(Value::Array(arms)) = schema.get(keyword) {
            for arm in arms {
                collect_into(arm, loc, out);
            }
        }
    }
    if let Some(Value::Object(dependent_schemas)) = schema.get(DEPENDENT_SCHEMAS) {
        for (key, sub) in dependent_schemas {
            out.insert(loc.join(key.clone()));
            collect_into(sub, loc, out);
        }
    }
    if let Some(Value::Object(dependent_required)) = schema.get(DEPENDENT_REQUIRED) {
        for key in dependent_required.keys() {
            out.insert(loc.join(key.clone()));
        }
    }
}

/// Collects the dependency paths contributed by an `if` predicate's own
/// `properties` declaration: `{properties: {k: ...}}` depends on
/// `instanceLocation/k`.
fn collect_predicate(if_schema: &Value, loc: &PointerBuf, out: &mut HashSet<PointerBuf>) {
    if let Some(Value::Object(properties)) = if_schema.get("properties") {
        for key in properties.keys() {
            out.insert(loc.join(key.clone()));
        }
    }
}
