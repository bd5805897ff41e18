//! Per-keyword checks making up [`crate::BasicValidator`].
//!
//! Most of these are local to the schema fragment they're handed: `type`,
//! `enum`, `const`, `required`, the numeric/string/array bound keywords
//! (`minimum`/`maximum`/`exclusiveMinimum`/`exclusiveMaximum`/`multipleOf`,
//! `minLength`/`maxLength`/`pattern`, `minItems`/`maxItems`), and
//! `additionalProperties: false`. A node's own child already gets its own
//! node and its own [`Validate::validate`](trellis_core::Validate) call, so
//! re-checking `properties`/`patternProperties`/`items` sub-schemas here
//! would usually be redundant.
//!
//! It isn't redundant, though, for the handful of schema fragments that
//! never become a node's own effective schema: `not`'s sub-schema, and
//! the `if`/`anyOf`/`oneOf` arms the reconciler evaluates as one-shot
//! predicates via a single `validate()` call. Those are ordinary JSON
//! Schema fragments that may nest `properties`/`items` themselves (the
//! idiomatic way to write a predicate is `{"properties": {"k": {"const":
//! ...}}}`), and nothing else ever checks them, so `check_properties`,
//! `check_pattern_properties`, and `check_items` recurse.

mod array;
mod const_;
mod enum_;
mod not;
mod numeric;
mod object;
mod required;
mod string;
mod type_;

pub(crate) use array::{check_array, check_items};
pub(crate) use const_::check_const;
pub(crate) use enum_::check_enum;
pub(crate) use not::check_not;
pub(crate) use numeric::check_numeric;
pub(crate) use object::{check_object, check_pattern_properties, check_properties};
pub(crate) use required::check_required;
pub(crate) use string::check_string;
pub(crate) use type_::check_type;

/// The JSON Schema primitive type name of `value`.
pub(crate) fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
