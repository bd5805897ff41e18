//! The validator interface (§6.3): the one external collaborator the
//! runtime treats as pure and side-effect-free. The runtime never ships a
//! validator of its own beyond the reference implementation in the
//! `trellis` facade crate; this module only defines the seam.

use serde_json::Value;
use trellis_pointer::PointerBuf;

/// A single request to validate `instance` at `instance_location` against
/// `schema`, which was found in the schema document at `keyword_location`.
#[derive(Debug, Clone, Copy)]
pub struct ValidateRequest<'a> {
    /// The effective schema to validate against.
    pub schema: &'a Value,
    /// The instance value being validated.
    pub instance: &'a Value,
    /// Where `instance` lives within the overall instance document.
    pub instance_location: &'a PointerBuf,
    /// Where `schema` lives within the overall schema document.
    pub keyword_location: &'a PointerBuf,
}

/// A single reported validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationError {
    /// Human-readable description of the failure.
    pub error: String,
    /// Where the offending instance value lives.
    pub instance_location: PointerBuf,
    /// Where the offending schema keyword lives.
    pub keyword_location: PointerBuf,
}

/// The result of a single validation request, attached verbatim to
/// [`crate::node::FieldNode::error`](crate::node::FieldNode) when invalid.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ValidationOutput {
    /// Whether the instance validated.
    pub valid: bool,
    /// Individual failures, if any.
    pub errors: Vec<ValidationError>,
    /// A single summary message, mirroring the optional `error` field of
    /// the external validator contract.
    pub error: Option<String>,
}

impl ValidationOutput {
    /// Builds an invalid outcome out of one or more bare messages,
    /// all attributed to the same locations. Used for synthesized failures
    /// the resolver itself raises (type mismatches, schema anomalies) that
    /// never went through an external [`Validate::validate`] call.
    #[must_use]
    pub fn from_messages(
        messages: Vec<String>,
        instance_location: PointerBuf,
        keyword_location: PointerBuf,
    ) -> Self {
        let errors = messages
            .into_iter()
            .map(|error| ValidationError {
                error,
                instance_location: instance_location.clone(),
                keyword_location: keyword_location.clone(),
            })
            .collect::<Vec<_>>();
        let error = errors.first().map(|e| e.error.clone());
        Self {
            valid: false,
            errors,
            error,
        }
    }

    /// Folds `other` into `self`, keeping `self` invalid if either was.
    pub fn merge(&mut self, other: ValidationOutput) {
        self.valid &= other.valid;
        if self.error.is_none() {
            self.error = other.error;
        }
        self.errors.extend(other.errors);
    }
}

/// The external JSON Schema validator the runtime consumes as an opaque
/// collaborator (§6.3). Implementations are expected to be pure: the same
/// request always produces the same outcome, with no side effects.
pub trait Validate {
    /// Validates `request.instance` against `request.schema`.
    fn validate(&self, request: ValidateRequest<'_>) -> ValidationOutput;
}

impl<F> Validate for F
where
    F: Fn(ValidateRequest<'_>) -> ValidationOutput,
{
    fn validate(&self, request: ValidateRequest<'_>) -> ValidationOutput {
        self(request)
    }
}
