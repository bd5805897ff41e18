//! Public runtime facade (C9): lifecycle, queries, and the subscribe API.

use crate::defaults::FillStrategy;
use crate::error::{BuildError, InvalidRootSchemaCtx};
use crate::index::{Callback, Index, Subscription};
use crate::node::{FieldNode, NodeKey, Nodes};
use crate::reconcile::{self, Context, RemoveEmptyContainers};
use crate::schema;
use crate::validate::Validate;
use serde_json::Value;
use snafu::ensure;
use std::collections::HashSet;
use trellis_pointer::PointerBuf;

/// Construction/reconciliation options (§6.2).
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// How aggressively `remove_value`'s cleanup cascade removes now-empty
    /// optional containers.
    pub remove_empty_containers: RemoveEmptyContainers,
    /// The default generator strategy branch-switch defaults and
    /// `add_child` use when no explicit `init` is supplied.
    pub fill_defaults: FillStrategy,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            remove_empty_containers: RemoveEmptyContainers::Auto,
            fill_defaults: FillStrategy::Explicit,
        }
    }
}

/// The reactive runtime: a schema, an instance value, the node tree
/// mirroring it, and the dependency/notifier index, bound to one external
/// [`Validate`] collaborator.
pub struct Runtime<V: Validate> {
    validator: V,
    instance: Value,
    nodes: Nodes,
    index: Index,
    root: NodeKey,
    options: RuntimeOptions,
}

impl<V: Validate> Runtime<V> {
    /// Builds a runtime from `schema` (dereferenced once up front) and an
    /// optional `initial_value`, filling in branch-switch/required
    /// defaults as the root node's first build would for any other
    /// schema change.
    ///
    /// # Errors
    /// Returns [`BuildError::InvalidRootSchema`] if `schema` is neither a
    /// JSON object nor a boolean.
    pub fn new(
        validator: V,
        schema: Value,
        initial_value: Option<Value>,
        options: Option<RuntimeOptions>,
    ) -> Result<Self, BuildError> {
        ensure!(
            self::schema::is_schema(&schema),
            InvalidRootSchemaCtx {
                value: Box::new(schema.clone())
            }
        );
        let options = options.unwrap_or_default();
        let dereferenced = schema::dereference(&schema);

        let mut nodes = Nodes::new();
        let root = nodes.insert(FieldNode::new(
            PointerBuf::root(),
            PointerBuf::root(),
            dereferenced,
            false,
            None,
        ));

        let mut runtime = Self {
            validator,
            instance: initial_value.unwrap_or(Value::Null),
            nodes,
            index: Index::new(),
            root,
            options,
        };

        let span = tracing::info_span!("runtime_new");
        let _entered = span.enter();
        let mut updating = HashSet::new();
        {
            let mut ctx = runtime.context();
            reconcile::build_node(&mut ctx, root, None, &mut updating);
        }
        Ok(runtime)
    }

    fn context(&mut self) -> Context<'_> {
        Context {
            instance: &mut self.instance,
            nodes: &mut self.nodes,
            index: &mut self.index,
            validator: &self.validator,
            fill_defaults: self.options.fill_defaults,
            remove_empty_containers: self.options.remove_empty_containers,
        }
    }

    /// Returns the instance value at `path` (`""`/`"#"` both mean root).
    #[must_use]
    pub fn get_value(&self, path: &PointerBuf) -> Option<&Value> {
        trellis_pointer::get(&self.instance, path)
    }

    /// Writes `value` at `path`. Returns `false` on a kind-mismatching
    /// intermediate path; the instance is left unchanged in that case.
    pub fn set_value(&mut self, path: &PointerBuf, value: Value) -> bool {
        let span = tracing::info_span!("set_value", path = %path);
        let _entered = span.enter();
        let root = self.root;
        let mut ctx = self.context();
        reconcile::set_value(&mut ctx, root, path, value)
    }

    /// Adds a child under `parent_path`. `key` is required for an object
    /// parent and ignored for an array parent (append at current length).
    /// `init` overrides the generated default. Returns `false` when the
    /// parent's `can_add` is false, an object add is missing `key`, or the
    /// key already exists.
    pub fn add_child(
        &mut self,
        parent_path: &PointerBuf,
        key: Option<String>,
        init: Option<Value>,
    ) -> bool {
        let span = tracing::info_span!("add_child", parent = %parent_path);
        let _entered = span.enter();
        let root = self.root;
        let mut ctx = self.context();
        reconcile::add_child(&mut ctx, root, parent_path, key, init)
    }

    /// Removes the value at `path`, then cascades empty-container cleanup
    /// upward per [`RuntimeOptions::remove_empty_containers`]. Returns
    /// `false` at the root or when the target's `can_remove` is false.
    pub fn remove_value(&mut self, path: &PointerBuf) -> bool {
        let span = tracing::info_span!("remove_value", path = %path);
        let _entered = span.enter();
        let root = self.root;
        let mut ctx = self.context();
        reconcile::remove_value(&mut ctx, root, path)
    }

    /// Replaces the root schema (dereferenced) and rebuilds from the root.
    ///
    /// # Errors
    /// Returns [`BuildError::InvalidRootSchema`] if `schema` is neither a
    /// JSON object nor a boolean.
    pub fn set_schema(&mut self, schema: Value) -> Result<(), BuildError> {
        ensure!(
            self::schema::is_schema(&schema),
            InvalidRootSchemaCtx {
                value: Box::new(schema.clone())
            }
        );
        let span = tracing::info_span!("set_schema");
        let _entered = span.enter();
        let root = self.root;
        let mut ctx = self.context();
        reconcile::set_schema(&mut ctx, root, schema);
        Ok(())
    }

    /// Looks up the node currently built at `path`, if any.
    #[must_use]
    pub fn find_node(&self, path: &PointerBuf) -> Option<&FieldNode> {
        let key = self.nodes.find(self.root, path)?;
        self.nodes.get(key)
    }

    /// Looks up a node by its stable key, surviving reconciliation as long
    /// as the node itself isn't removed.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&FieldNode> {
        self.nodes.get(key)
    }

    /// The root node's stable key.
    #[must_use]
    pub fn root_key(&self) -> NodeKey {
        self.root
    }

    /// The monotone event counter; strictly increases on every emitted
    /// event.
    #[must_use]
    pub fn get_version(&self) -> u64 {
        self.index.version()
    }

    /// Subscribes to events at `path`.
    pub fn subscribe(&mut self, path: PointerBuf, callback: Callback) -> Subscription {
        self.index.subscribe(path, callback)
    }

    /// Subscribes to every event, regardless of path.
    pub fn subscribe_all(&mut self, callback: Callback) -> Subscription {
        self.index.subscribe_all(callback)
    }

    /// Removes a subscription returned by `subscribe`/`subscribe_all`.
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.index.unsubscribe(subscription);
    }
}
