//! Reconciler / mutation engine (C7): the in-place node-tree rebuild
//! algorithm and the four mutation entry points built on top of it:
//! `set_value`, `add_child`, `remove_value`, `set_schema`.

use crate::defaults::{self, FillStrategy};
use crate::dependency;
use crate::effective::{self, Resolved};
use crate::index::{EventKind, Index};
use crate::node::{FieldNode, NodeKey, NodeType, Nodes};
use crate::schema::{self, ChildKey, Selected};
use crate::validate::Validate;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use trellis_pointer::{PointerBuf, Token};

/// How aggressively [`remove_value`]'s upward cleanup removes now-empty
/// optional containers (§4.7.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveEmptyContainers {
    /// Remove an emptied container iff its own node is itself removable
    /// (Open Question 3, resolved): inspect each intermediate node's own
    /// `can_remove`, not just whether its parent allows additional
    /// properties.
    #[default]
    Auto,
    /// Always remove an emptied container.
    Always,
    /// Never remove; the cascade stops at the first emptied container.
    Never,
}

/// The mutable state one reconciliation pass threads through: the live
/// instance, the node arena, the dependency/notification index, and the
/// (stateless) validator.
pub(crate) struct Context<'a> {
    pub instance: &'a mut Value,
    pub nodes: &'a mut Nodes,
    pub index: &'a mut Index,
    pub validator: &'a dyn Validate,
    pub fill_defaults: FillStrategy,
    pub remove_empty_containers: RemoveEmptyContainers,
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                               build_node                                ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// Idempotent in-place rebuild of `key`, optionally swapping its
/// `original_schema` first. `updating` is the per-top-level-mutation
/// re-entrancy guard keyed by `instance_location` (§5).
pub(crate) fn build_node(
    ctx: &mut Context<'_>,
    key: NodeKey,
    new_schema: Option<Value>,
    updating: &mut HashSet<PointerBuf>,
) {
    let Some(node) = ctx.nodes.get(key) else {
        return;
    };
    let instance_location = node.instance_location.clone();
    if !updating.insert(instance_location.clone()) {
        return;
    }

    if let Some(new_schema) = new_schema {
        swap_schema_if_changed(ctx, key, &instance_location, new_schema);
    }

    let keyword_location = ctx.nodes.get(key).unwrap().keyword_location.clone();
    let original_schema = ctx.nodes.get(key).unwrap().original_schema.clone();
    let value = trellis_pointer::get(ctx.instance, &instance_location).cloned();

    let Resolved {
        type_,
        effective_schema,
        error,
    } = effective::resolve(
        &original_schema,
        value.as_ref(),
        &instance_location,
        &keyword_location,
        ctx.validator,
    );

    let prior_schema = ctx.nodes.get(key).unwrap().schema.clone();
    let prior_type = ctx.nodes.get(key).unwrap().type_;
    let prior_error = ctx.nodes.get(key).unwrap().error.clone();
    let resolved_type = NodeType::parse(&type_);
    let schema_changed = prior_schema != effective_schema || prior_type != resolved_type;

    if schema_changed {
        apply_branch_switch_defaults(ctx, &instance_location, &effective_schema);
    }
    let value = trellis_pointer::get(ctx.instance, &instance_location).cloned();

    {
        let node = ctx.nodes.get_mut(key).unwrap();
        node.schema = effective_schema.clone();
        node.type_ = resolved_type;
        node.error = error.clone();
        node.version += 1;
    }
    tracing::debug!(path = %instance_location, version = ctx.nodes.get(key).unwrap().version, "node rebuilt");

    rebuild_children(ctx, key, &effective_schema, value.as_ref(), updating);

    if schema_changed {
        ctx.index.notify(EventKind::Schema, instance_location.clone());
    }
    if error != prior_error {
        ctx.index.notify(EventKind::Error, instance_location.clone());
    }

    for dependent_key in ctx.index.dependents_of(&instance_location) {
        if dependent_key != key {
            build_node(ctx, dependent_key, None, updating);
        }
    }
}

fn swap_schema_if_changed(
    ctx: &mut Context<'_>,
    key: NodeKey,
    instance_location: &PointerBuf,
    new_schema: Value,
) {
    let changed = ctx
        .nodes
        .get(key)
        .is_some_and(|node| node.original_schema != new_schema);
    if !changed {
        return;
    }
    let old_dependencies = ctx
        .nodes
        .get(key)
        .map(|node| node.dependencies.clone())
        .unwrap_or_default();
    for dependency_path in &old_dependencies {
        ctx.index.unregister_dependency(dependency_path, key);
    }
    let new_dependencies = dependency::collect(&new_schema, instance_location);
    for dependency_path in &new_dependencies {
        ctx.index.register_dependency(dependency_path.clone(), key);
    }
    if let Some(node) = ctx.nodes.get_mut(key) {
        node.original_schema = new_schema;
        node.dependencies = new_dependencies;
    }
}

/// §4.7.1: when a node's effective schema changes, fill in defaults at
/// `location` per [`defaults::generate`]. Required properties/positions
/// synthesize a typed default under `Explicit`, everything does under
/// `Always`, and an already-present value's own keys are never
/// overwritten. A `null`/absent value at `location` itself (the common
/// case for a freshly-constructed root) is treated as "nothing yet" so a
/// whole container can be synthesized, not merged into.
fn apply_branch_switch_defaults(ctx: &mut Context<'_>, location: &PointerBuf, effective_schema: &Value) {
    let current = trellis_pointer::get(ctx.instance, location).cloned();
    let existing = current.filter(|value| !value.is_null());
    if let Some(defaulted) = defaults::generate(effective_schema, existing.as_ref(), ctx.fill_defaults) {
        trellis_pointer::set(ctx.instance, location, defaulted);
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                           Child reconciliation                          ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

fn rebuild_children(
    ctx: &mut Context<'_>,
    key: NodeKey,
    effective_schema: &Value,
    value: Option<&Value>,
    updating: &mut HashSet<PointerBuf>,
) {
    let location = ctx.nodes.get(key).unwrap().instance_location.clone();
    let old_children = ctx.nodes.get(key).unwrap().children.clone();
    let mut reuse: HashMap<Token, NodeKey> = old_children.into_iter().collect();

    let mut new_children = Vec::new();
    let can_add;

    match value {
        Some(Value::Object(object)) => {
            let mut emitted: HashSet<String> = HashSet::new();
            if let Some(properties) = effective_schema.get(schema::PROPERTIES).and_then(Value::as_object) {
                for prop_key in properties.keys() {
                    emitted.insert(prop_key.clone());
                    let selected = schema::select_child(effective_schema, &ChildKey::Property(prop_key))
                        .expect("declared property is always selectable");
                    new_children.push(reconcile_child(ctx, key, prop_key, &location, &selected, &mut reuse, updating));
                }
            }
            let mut pattern_matched = Vec::new();
            let mut additional_matched = Vec::new();
            for object_key in object.keys() {
                if emitted.contains(object_key) {
                    continue;
                }
                let Some(selected) = schema::select_child(effective_schema, &ChildKey::Property(object_key)) else {
                    continue;
                };
                let via_pattern = selected
                    .keyword_location
                    .tokens()
                    .first()
                    .is_some_and(|t| t.decoded() == schema::PATTERN_PROPERTIES);
                if via_pattern {
                    pattern_matched.push((object_key.clone(), selected));
                } else {
                    additional_matched.push((object_key.clone(), selected));
                }
            }
            for (object_key, selected) in pattern_matched.into_iter().chain(additional_matched) {
                new_children.push(reconcile_child(ctx, key, &object_key, &location, &selected, &mut reuse, updating));
            }
            can_add = matches!(
                effective_schema.get(schema::ADDITIONAL_PROPERTIES),
                Some(sub) if schema::is_schema(sub) && sub != &Value::Bool(false)
            );
        }
        Some(Value::Array(array)) => {
            for index in 0..array.len() {
                let Some(selected) = schema::select_child(effective_schema, &ChildKey::Index(index)) else {
                    break;
                };
                new_children.push(reconcile_child(
                    ctx,
                    key,
                    &index.to_string(),
                    &location,
                    &selected,
                    &mut reuse,
                    updating,
                ));
            }
            can_add = effective_schema.get(schema::ITEMS).is_some();
        }
        _ => can_add = false,
    }

    for (_, stale_key) in reuse {
        remove_subtree(ctx, stale_key);
    }

    let node = ctx.nodes.get_mut(key).unwrap();
    node.children = new_children;
    node.can_add = can_add;
}

fn reconcile_child(
    ctx: &mut Context<'_>,
    parent: NodeKey,
    token_str: &str,
    parent_location: &PointerBuf,
    selected: &Selected,
    reuse: &mut HashMap<Token, NodeKey>,
    updating: &mut HashSet<PointerBuf>,
) -> (Token, NodeKey) {
    let token = Token::new(token_str.to_string());
    let child_location = parent_location.join(token.clone());
    let parent_keyword_location = ctx.nodes.get(parent).unwrap().keyword_location.clone();
    let child_keyword_location = parent_keyword_location.concat(&selected.keyword_location);

    let child_key = if let Some(existing) = reuse.remove(&token) {
        if let Some(node) = ctx.nodes.get_mut(existing) {
            node.keyword_location = child_keyword_location;
            node.can_remove = selected.can_remove;
        }
        build_node(ctx, existing, Some(selected.schema.clone()), updating);
        existing
    } else {
        let mut node = FieldNode::new(
            child_location.clone(),
            child_keyword_location,
            selected.schema.clone(),
            selected.can_remove,
            Some(parent),
        );
        let dependencies = dependency::collect(&selected.schema, &child_location);
        node.dependencies = dependencies.clone();
        let new_key = ctx.nodes.insert(node);
        for dependency_path in &dependencies {
            ctx.index.register_dependency(dependency_path.clone(), new_key);
        }
        build_node(ctx, new_key, None, updating);
        new_key
    };
    (token, child_key)
}

fn remove_subtree(ctx: &mut Context<'_>, key: NodeKey) {
    let Some(node) = ctx.nodes.remove(key) else {
        return;
    };
    for dependency_path in &node.dependencies {
        ctx.index.unregister_dependency(dependency_path, key);
    }
    for (_, child_key) in node.children {
        remove_subtree(ctx, child_key);
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                                Mutations                                 ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// §4.7.3 `setValue`.
pub(crate) fn set_value(ctx: &mut Context<'_>, root: NodeKey, path: &PointerBuf, value: Value) -> bool {
    if !trellis_pointer::set(ctx.instance, path, value) {
        return false;
    }
    let mut updating = HashSet::new();
    if path.is_root() {
        build_node(ctx, root, None, &mut updating);
    } else if let Some((parent_path, _)) = path.split_last() {
        if let Some(parent_key) = ctx.nodes.find(root, &parent_path) {
            build_node(ctx, parent_key, None, &mut updating);
        }
    }
    ctx.index.notify(EventKind::Value, path.clone());
    true
}

/// §4.7.3 `addChild`.
pub(crate) fn add_child(
    ctx: &mut Context<'_>,
    root: NodeKey,
    parent_path: &PointerBuf,
    key: Option<String>,
    init: Option<Value>,
) -> bool {
    let Some(parent_key) = ctx.nodes.find(root, parent_path) else {
        return false;
    };
    let Some(parent_node) = ctx.nodes.get(parent_key) else {
        return false;
    };
    if !parent_node.can_add {
        return false;
    }
    let effective_schema = parent_node.schema.clone();
    let parent_type = parent_node.type_;

    let (child_path, child_key_kind_is_index) = match parent_type {
        NodeType::Array => {
            let len = trellis_pointer::get(ctx.instance, parent_path)
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            (parent_path.join(len), true)
        }
        NodeType::Object => {
            let Some(key) = key else {
                return false;
            };
            let already_present = trellis_pointer::get(ctx.instance, parent_path)
                .and_then(Value::as_object)
                .is_some_and(|object| object.contains_key(&key));
            if already_present {
                return false;
            }
            (parent_path.join(key), false)
        }
        _ => return false,
    };

    let Some(last) = child_path.last() else {
        return false;
    };
    let selected = if child_key_kind_is_index {
        schema::select_child(&effective_schema, &ChildKey::Index(last.as_index().unwrap_or(0)))
    } else {
        schema::select_child(&effective_schema, &ChildKey::Property(last.decoded()))
    };
    let Some(selected) = selected else {
        return false;
    };

    let value = init.unwrap_or_else(|| {
        // an explicitly added child has no instance value to merge into,
        // and `ctx.fill_defaults` only fills what's required. Synthesize a
        // typed default regardless of the runtime's configured strategy:
        // an `addChild` call always produces a concrete leaf, never `null`.
        defaults::generate(&selected.schema, None, FillStrategy::Always).unwrap_or(Value::Null)
    });
    if !trellis_pointer::set(ctx.instance, &child_path, value) {
        return false;
    }

    let mut updating = HashSet::new();
    build_node(ctx, parent_key, None, &mut updating);
    ctx.index.notify(EventKind::Value, parent_path.clone());
    true
}

/// §4.7.3 `removeValue`, including the empty-container cleanup cascade.
pub(crate) fn remove_value(ctx: &mut Context<'_>, root: NodeKey, path: &PointerBuf) -> bool {
    if path.is_root() {
        return false;
    }
    let Some(target_key) = ctx.nodes.find(root, path) else {
        return false;
    };
    let Some(target) = ctx.nodes.get(target_key) else {
        return false;
    };
    if !target.can_remove {
        return false;
    }
    if !trellis_pointer::remove(ctx.instance, path) {
        return false;
    }

    let mut cursor = path.clone();
    let mut notify_path = path
        .split_last()
        .map_or_else(PointerBuf::root, |(parent, _)| parent);
    loop {
        let Some((ancestor_path, _)) = cursor.split_last() else {
            break;
        };
        let Some(ancestor_value) = trellis_pointer::get(ctx.instance, &ancestor_path) else {
            break;
        };
        let is_empty = match ancestor_value {
            Value::Array(arr) => arr.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if !is_empty {
            break;
        }
        let should_remove = match ctx.remove_empty_containers {
            RemoveEmptyContainers::Never => false,
            RemoveEmptyContainers::Always => true,
            RemoveEmptyContainers::Auto => {
                let own_node_removable = ctx
                    .nodes
                    .find(root, &ancestor_path)
                    .and_then(|key| ctx.nodes.get(key))
                    .is_some_and(|node| node.can_remove);
                own_node_removable || is_declared_optional_property(ctx, root, &ancestor_path)
            }
        };
        if !should_remove || !trellis_pointer::remove(ctx.instance, &ancestor_path) {
            break;
        }
        notify_path = ancestor_path
            .split_last()
            .map_or_else(PointerBuf::root, |(parent, _)| parent);
        cursor = ancestor_path;
    }

    let mut updating = HashSet::new();
    let surviving_key = ctx.nodes.find(root, &notify_path).unwrap_or(root);
    build_node(ctx, surviving_key, None, &mut updating);
    ctx.index.notify(EventKind::Value, notify_path);
    true
}

/// §4.7.3's second `auto` cleanup disjunct: a declared (not
/// `additionalProperties`/`patternProperties`) object property that its
/// own parent schema does not list as `required` is an optional property
/// the parent permits removing by policy, even though the property's own
/// node reports `can_remove: false`.
fn is_declared_optional_property(ctx: &Context<'_>, root: NodeKey, path: &PointerBuf) -> bool {
    let Some((parent_path, last)) = path.split_last() else {
        return false;
    };
    if last.as_index().is_some() {
        return false;
    }
    let Some(parent_node) = ctx
        .nodes
        .find(root, &parent_path)
        .and_then(|key| ctx.nodes.get(key))
    else {
        return false;
    };
    if parent_node.type_ != NodeType::Object {
        return false;
    }
    !schema::required_of(&parent_node.schema).iter().any(|name| name == last.decoded())
}

/// §4.7.3 `setSchema`: dereferences `new_schema`, swaps it onto the root,
/// and rebuilds from there. The schema-change notification this produces
/// is the general `build_node` one (step 6); `setSchema` doesn't force a
/// second, redundant event when the new schema resolves identically.
pub(crate) fn set_schema(ctx: &mut Context<'_>, root: NodeKey, new_schema: Value) {
    let dereferenced = schema::dereference(&new_schema);
    let mut updating = HashSet::new();
    build_node(ctx, root, Some(dereferenced), &mut updating);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;
    use crate::validate::{ValidateRequest, ValidationOutput};
    use serde_json::json;

    struct AlwaysValid;
    impl Validate for AlwaysValid {
        fn validate(&self, _: ValidateRequest<'_>) -> ValidationOutput {
            ValidationOutput {
                valid: true,
                errors: Vec::new(),
                error: None,
            }
        }
    }

    fn build_root(schema: Value, instance: Value) -> (Nodes, Index, NodeKey, Value) {
        let mut nodes = Nodes::new();
        let index = Index::new();
        let root_schema = schema::dereference(&schema);
        let root = nodes.insert(FieldNode::new(
            PointerBuf::root(),
            PointerBuf::root(),
            root_schema,
            false,
            None,
        ));
        (nodes, index, root, instance)
    }

    #[test]
    fn set_value_rebuilds_dependent_branch() {
        let schema = json!({
            "if": {"properties": {"val": {"const": 1}}},
            "then": {"properties": {"dependent": {"type": "string"}}},
            "else": {"properties": {"dependent": {"type": "number"}}},
            "properties": {"val": {}, "dependent": {}}
        });
        let (mut nodes, mut index, root, mut instance) =
            build_root(schema, json!({"val": 1, "dependent": "foo"}));
        let mut updating = HashSet::new();
        {
            let mut ctx = Context {
                instance: &mut instance,
                nodes: &mut nodes,
                index: &mut index,
                validator: &AlwaysValid,
                fill_defaults: FillStrategy::Explicit,
                remove_empty_containers: RemoveEmptyContainers::Auto,
            };
            build_node(&mut ctx, root, None, &mut updating);
        }
        let dependent_path = PointerBuf::parse("/dependent").unwrap();
        let dependent_key = nodes.find(root, &dependent_path).unwrap();
        assert_eq!(nodes.get(dependent_key).unwrap().schema["type"], json!("string"));

        let mut ctx = Context {
            instance: &mut instance,
            nodes: &mut nodes,
            index: &mut index,
            validator: &AlwaysValid,
            fill_defaults: FillStrategy::Explicit,
            remove_empty_containers: RemoveEmptyContainers::Auto,
        };
        assert!(set_value(&mut ctx, root, &PointerBuf::parse("/val").unwrap(), json!(2)));
        let dependent_key = ctx.nodes.find(root, &dependent_path).unwrap();
        assert_eq!(ctx.nodes.get(dependent_key).unwrap().schema["type"], json!("number"));
    }

    #[test]
    fn add_then_remove_restores_empty_object() {
        let schema = json!({"type": "object", "additionalProperties": {"type": "number"}});
        let (mut nodes, mut index, root, mut instance) = build_root(schema, json!({}));
        let mut updating = HashSet::new();
        {
            let mut ctx = Context {
                instance: &mut instance,
                nodes: &mut nodes,
                index: &mut index,
                validator: &AlwaysValid,
                fill_defaults: FillStrategy::Explicit,
                remove_empty_containers: RemoveEmptyContainers::Never,
            };
            build_node(&mut ctx, root, None, &mut updating);
        }

        let mut ctx = Context {
            instance: &mut instance,
            nodes: &mut nodes,
            index: &mut index,
            validator: &AlwaysValid,
            fill_defaults: FillStrategy::Explicit,
            remove_empty_containers: RemoveEmptyContainers::Never,
        };
        assert!(add_child(&mut ctx, root, &PointerBuf::root(), Some("age".to_string()), None));
        assert_eq!(*ctx.instance, json!({"age": 0}));
        let age_key = ctx.nodes.find(root, &PointerBuf::parse("/age").unwrap()).unwrap();
        assert!(ctx.nodes.get(age_key).unwrap().can_remove);

        assert!(remove_value(&mut ctx, root, &PointerBuf::parse("/age").unwrap()));
        assert_eq!(*ctx.instance, json!({}));
    }

    #[test]
    fn auto_cleanup_removes_emptied_additional_property() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": {"type": "array", "items": {"type": "string"}}
        });
        let (mut nodes, mut index, root, mut instance) =
            build_root(schema, json!({"name": "t", "command": ["echo"]}));
        let mut updating = HashSet::new();
        {
            let mut ctx = Context {
                instance: &mut instance,
                nodes: &mut nodes,
                index: &mut index,
                validator: &AlwaysValid,
                fill_defaults: FillStrategy::Explicit,
                remove_empty_containers: RemoveEmptyContainers::Auto,
            };
            build_node(&mut ctx, root, None, &mut updating);
        }
        let mut ctx = Context {
            instance: &mut instance,
            nodes: &mut nodes,
            index: &mut index,
            validator: &AlwaysValid,
            fill_defaults: FillStrategy::Explicit,
            remove_empty_containers: RemoveEmptyContainers::Auto,
        };
        assert!(remove_value(&mut ctx, root, &PointerBuf::parse("/command/0").unwrap()));
        assert_eq!(*ctx.instance, json!({"name": "t"}));
    }
}
