//! Core of the reactive JSON-Schema runtime: the effective-schema
//! resolver, the node tree, the reconciler/mutation engine, the
//! dependency index & notifier, and the public [`Runtime`] facade.
//!
//! This crate never ships a JSON Schema validator of its own; it consumes
//! one through the [`Validate`] seam (see the `trellis` facade crate for
//! a reference implementation).
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::needless_pass_by_value)]

pub mod defaults;
pub mod dependency;
pub mod effective;
pub mod error;
pub mod index;
pub mod node;
mod reconcile;
pub mod schema;
pub mod validate;

mod runtime;

pub use defaults::FillStrategy;
pub use error::BuildError;
pub use index::{Callback, Event, EventKind, Index, Subscription};
pub use node::{FieldNode, NodeKey, NodeType, Nodes};
pub use reconcile::RemoveEmptyContainers;
pub use runtime::{Runtime, RuntimeOptions};
pub use validate::{Validate, ValidateRequest, ValidationError, ValidationOutput};

pub use trellis_pointer::{PointerBuf, Token};
