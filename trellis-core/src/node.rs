//! The node tree (C6): `FieldNode`s stored in a `slotmap` arena.
//!
//! A `slotmap::SlotMap` gives every node a stable, `Copy` `NodeKey` that
//! survives in-place rebuilds, the opaque-identifier approach the design
//! notes (§9) recommend for value-semantics languages, since Rust cannot
//! hand a caller a live mutable alias into the tree without also handing
//! them the borrow checker's objections.

use crate::validate::ValidationOutput;
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};
use std::collections::HashSet;
use std::fmt;
use trellis_pointer::{PointerBuf, Token};

new_key_type! {
    /// Opaque, stable identifier for a [`FieldNode`] within a [`Runtime`](crate::Runtime).
    pub struct NodeKey;
}

/// The seven primitive JSON Schema types a node can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Null,
    Boolean,
    Number,
    Integer,
    String,
    Object,
    Array,
}

impl NodeType {
    /// Parses the resolver's type string into a `NodeType`, falling back
    /// to `String` for anything unrecognized (the resolver never emits
    /// anything else, but this keeps the mapping total).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "object" => Self::Object,
            "array" => Self::Array,
            _ => Self::String,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
        };
        f.write_str(s)
    }
}

/// The unit of reactivity: a node mirroring one position in the instance,
/// carrying its effective schema, resolved type, validation output, and
/// ordered children.
#[derive(Debug, Clone)]
pub struct FieldNode {
    /// Pointer of this node within the instance.
    pub instance_location: PointerBuf,
    /// Pointer of the sub-schema that produced this node.
    pub keyword_location: PointerBuf,
    /// Sub-schema fragment before conditional evaluation.
    pub original_schema: Value,
    /// Effective schema after conditional evaluation against the current
    /// value.
    pub schema: Value,
    /// Resolved primitive type.
    pub type_: NodeType,
    /// Validation output, absent iff valid (or skipped: optional +
    /// undefined).
    pub error: Option<ValidationOutput>,
    /// Ordered children, keyed by the instance token they occupy.
    pub children: Vec<(Token, NodeKey)>,
    /// Absolute instance paths whose values affect this node's effective
    /// schema.
    pub dependencies: HashSet<PointerBuf>,
    /// True for an array `items`/`additionalProperties`/`patternProperties`
    /// entry; false for a declared `properties` entry or `prefixItems`.
    pub can_remove: bool,
    /// True if this node's effective schema permits adding a child.
    pub can_add: bool,
    /// Monotone counter of in-place updates to this node.
    pub version: u64,
    /// The parent node, `None` only for the root.
    pub(crate) parent: Option<NodeKey>,
}

impl FieldNode {
    pub(crate) fn new(
        instance_location: PointerBuf,
        keyword_location: PointerBuf,
        original_schema: Value,
        can_remove: bool,
        parent: Option<NodeKey>,
    ) -> Self {
        Self {
            instance_location,
            keyword_location,
            schema: original_schema.clone(),
            original_schema,
            type_: NodeType::Null,
            error: None,
            children: Vec::new(),
            dependencies: HashSet::new(),
            can_remove,
            can_add: false,
            version: 0,
            parent,
        }
    }

    /// Looks up an already-built child by the token it occupies.
    #[must_use]
    pub fn child(&self, token: &Token) -> Option<NodeKey> {
        self.children
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, key)| *key)
    }
}

/// The arena backing the node tree.
#[derive(Debug, Default)]
pub struct Nodes {
    pub(crate) slots: SlotMap<NodeKey, FieldNode>,
}

impl Nodes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&FieldNode> {
        self.slots.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: NodeKey) -> Option<&mut FieldNode> {
        self.slots.get_mut(key)
    }

    pub(crate) fn insert(&mut self, node: FieldNode) -> NodeKey {
        self.slots.insert(node)
    }

    pub(crate) fn remove(&mut self, key: NodeKey) -> Option<FieldNode> {
        self.slots.remove(key)
    }

    /// Walks from `root` following `path`'s tokens via [`FieldNode::child`].
    #[must_use]
    pub fn find(&self, root: NodeKey, path: &PointerBuf) -> Option<NodeKey> {
        let mut current = root;
        for token in path.tokens() {
            current = self.get(current)?.child(token)?;
        }
        Some(current)
    }
}
