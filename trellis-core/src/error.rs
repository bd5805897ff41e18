//! Errors surfaced by the runtime to its caller.
//!
//! Per the error-handling design: structural misuse (a bad path, an
//! unaddable/unremovable node) is reported as a `bool`, not an error type;
//! validation failures and schema anomalies are carried as data on
//! [`crate::node::FieldNode::error`](crate::node::FieldNode). The only
//! condition that actually throws is constructing a [`crate::Runtime`] with
//! a schema that isn't a JSON object or boolean.

use serde_json::Value;
use snafu::Snafu;

/// Failure constructing a [`crate::Runtime`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(Ctx)))]
pub enum BuildError {
    /// The root schema handed to `Runtime::new`/`set_schema` was neither a
    /// JSON object nor a boolean.
    #[snafu(display("root schema must be a JSON object or boolean; found {value}"))]
    InvalidRootSchema {
        /// The offending value.
        value: Box<Value>,
    },
}
