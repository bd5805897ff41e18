//! End-to-end scenarios spanning resolution, reconciliation, and the
//! subscriber index together, against the public [`Runtime`] facade.

use serde_json::json;
use trellis_core::{PointerBuf, Runtime, RuntimeOptions, Validate, ValidateRequest, ValidationOutput};

/// Validates `const` (including one level into `properties`, enough to
/// drive `if`/`then`/`else` predicates), `type`, and `required`.
struct Stub;
impl Validate for Stub {
    fn validate(&self, request: ValidateRequest<'_>) -> ValidationOutput {
        let schema = request.schema;
        let mut errors = Vec::new();
        if let Some(expected) = schema.get("const") {
            if expected != request.instance {
                errors.push(trellis_core::ValidationError {
                    error: "const mismatch".to_string(),
                    instance_location: request.instance_location.clone(),
                    keyword_location: request.keyword_location.clone(),
                });
            }
        }
        if let Some(properties) = schema.get("properties").and_then(serde_json::Value::as_object) {
            if let Some(object) = request.instance.as_object() {
                for (key, sub) in properties {
                    if let Some(expected) = sub.get("const") {
                        if let Some(actual) = object.get(key) {
                            if expected != actual {
                                errors.push(trellis_core::ValidationError {
                                    error: format!("{key} const mismatch"),
                                    instance_location: request.instance_location.clone(),
                                    keyword_location: request.keyword_location.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
        if let Some(declared) = schema.get("type").and_then(serde_json::Value::as_str) {
            let matches = match declared {
                "string" => request.instance.is_string(),
                "number" => request.instance.is_number(),
                "object" => request.instance.is_object(),
                "array" => request.instance.is_array(),
                _ => true,
            };
            if !matches {
                errors.push(trellis_core::ValidationError {
                    error: format!("expected {declared}"),
                    instance_location: request.instance_location.clone(),
                    keyword_location: request.keyword_location.clone(),
                });
            }
        }
        if let Some(object) = request.instance.as_object() {
            for name in trellis_core::schema::required_of(schema) {
                if !object.contains_key(&name) {
                    errors.push(trellis_core::ValidationError {
                        error: format!("missing {name}"),
                        instance_location: request.instance_location.clone(),
                        keyword_location: request.keyword_location.clone(),
                    });
                }
            }
        }
        ValidationOutput {
            valid: errors.is_empty(),
            error: errors.first().map(|e| e.error.clone()),
            errors,
        }
    }
}

fn ptr(s: &str) -> PointerBuf {
    PointerBuf::parse(s).unwrap()
}

/// S1: a root-level `if`/`then`/`else` switches a sibling property's
/// effective schema, and editing the predicate's own property rebuilds
/// only the dependent branch.
#[test]
fn conditional_branch_switches_on_predicate_edit() {
    let schema = json!({
        "type": "object",
        "properties": {"plan": {}, "seats": {}},
        "if": {"properties": {"plan": {"const": "team"}}},
        "then": {"properties": {"seats": {"type": "number"}}},
        "else": {"properties": {"seats": {"type": "string"}}}
    });
    let mut runtime = Runtime::new(
        Stub,
        schema,
        Some(json!({"plan": "solo", "seats": "n/a"})),
        None,
    )
    .unwrap();

    let seats = runtime.find_node(&ptr("/seats")).unwrap();
    assert_eq!(seats.schema["type"], json!("string"));

    runtime.set_value(&ptr("/plan"), json!("team"));
    // changing /plan doesn't change /seats' own value, so defaults are
    // never applied there, but its effective schema does switch.
    let seats = runtime.find_node(&ptr("/seats")).unwrap();
    assert_eq!(seats.schema["type"], json!("number"));
}

/// A `oneOf` arm matching more than one branch is an anomaly (Open
/// Question 1): the first match wins and the node carries an error.
#[test]
fn one_of_tie_merges_first_match_and_flags_anomaly() {
    let schema = json!({
        "oneOf": [
            {"properties": {"kind": {"const": "a"}}},
            {"properties": {"kind": {"const": "a"}}, "properties2_marker": true}
        ]
    });
    let runtime = Runtime::new(Stub, schema, Some(json!({"kind": "a"})), None).unwrap();
    let root = runtime.find_node(&PointerBuf::root()).unwrap();
    assert!(root.error.is_some());
}

/// `dependentSchemas` pulls in an extra `required` constraint only when
/// the triggering key is present, and the dependency graph reacts to it
/// being added after the fact.
#[test]
fn dependent_schema_required_reacts_to_added_key() {
    let schema = json!({
        "type": "object",
        "properties": {"cc": {}, "billing_address": {"type": "string"}},
        "dependentSchemas": {"cc": {"required": ["billing_address"]}}
    });
    let mut runtime = Runtime::new(
        Stub,
        schema,
        Some(json!({"billing_address": "unset"})),
        None,
    )
    .unwrap();
    let root = runtime.find_node(&PointerBuf::root()).unwrap();
    assert!(root.error.is_none());

    assert!(runtime.set_value(&ptr("/cc"), json!("4111")));
    let root = runtime.find_node(&PointerBuf::root()).unwrap();
    assert!(root.schema["required"]
        .as_array()
        .unwrap()
        .contains(&json!("billing_address")));
}

/// `set_schema` rebuilds the whole tree against a brand-new schema,
/// discarding the node types the previous schema declared.
#[test]
fn set_schema_replaces_root_type() {
    let mut runtime = Runtime::new(
        Stub,
        json!({"type": "object", "properties": {"x": {"type": "string"}}}),
        Some(json!({"x": "hi"})),
        None,
    )
    .unwrap();
    assert!(runtime.find_node(&ptr("/x")).is_some());

    runtime
        .set_schema(json!({"type": "array", "items": {"type": "number"}}))
        .unwrap();
    assert!(runtime.get_value(&PointerBuf::root()).unwrap().is_object());
    assert!(runtime.find_node(&ptr("/x")).is_none());
}

/// Unsubscribing stops further delivery without disturbing other
/// subscribers at the same path.
#[test]
fn unsubscribe_stops_delivery() {
    let mut runtime = Runtime::new(
        Stub,
        json!({"type": "object", "properties": {"x": {"type": "string"}}}),
        Some(json!({"x": "a"})),
        None,
    )
    .unwrap();
    let hits = std::rc::Rc::new(std::cell::RefCell::new(0));
    let h = hits.clone();
    let sub = runtime.subscribe(
        ptr("/x"),
        Box::new(move |_| {
            *h.borrow_mut() += 1;
            Ok(())
        }),
    );
    runtime.set_value(&ptr("/x"), json!("b"));
    assert_eq!(*hits.borrow(), 1);
    runtime.unsubscribe(sub);
    runtime.set_value(&ptr("/x"), json!("c"));
    assert_eq!(*hits.borrow(), 1);
}

/// `RuntimeOptions::fill_defaults = Always` synthesizes typed defaults
/// even for optional, undeclared-default properties.
#[test]
fn always_strategy_fills_optional_properties_too() {
    let schema = json!({
        "type": "object",
        "properties": {"name": {"type": "string"}, "age": {"type": "number"}},
        "required": ["name"]
    });
    let options = RuntimeOptions {
        fill_defaults: trellis_core::FillStrategy::Always,
        ..RuntimeOptions::default()
    };
    let runtime = Runtime::new(Stub, schema, None, Some(options)).unwrap();
    assert_eq!(
        runtime.get_value(&PointerBuf::root()).unwrap(),
        &json!({"name": "", "age": 0})
    );
}
