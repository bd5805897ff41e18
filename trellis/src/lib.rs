//! Reference [`Validate`] implementation for the reactive JSON-Schema
//! runtime in `trellis-core`.
//!
//! [`BasicValidator`] covers `type`, `enum`, `const`, `required`,
//! `minimum`/`maximum`/`exclusiveMinimum`/`exclusiveMaximum`/`multipleOf`,
//! `minLength`/`maxLength`/`pattern`, `minItems`/`maxItems`,
//! `additionalProperties: false`, `properties`/`patternProperties`/
//! `items`/`prefixItems` recursion, and `not`. It deliberately does not
//! itself evaluate `allOf`/`anyOf`/`oneOf`/`if`/`then`/`else`/
//! `dependentSchemas`. Those are resolved into a node's effective schema
//! before a node is ever handed to a validator. It still has to recurse
//! into `properties`/`patternProperties` and `items`, though: the
//! reconciler evaluates `if`/`anyOf`/`oneOf` arms, and `not`'s sub-schema,
//! as one-shot `validate()` calls against schema fragments that never
//! become a node's own effective schema, and those fragments are ordinary
//! JSON Schema that may themselves nest `properties`/`items`.
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod keyword;

pub use trellis_core::{
    BuildError, Callback, Event, EventKind, FieldNode, FillStrategy, NodeKey, NodeType, Nodes,
    PointerBuf, RemoveEmptyContainers, Runtime, RuntimeOptions, Subscription, Token, Validate,
    ValidateRequest, ValidationError, ValidationOutput,
};

/// A small, local JSON Schema validator covering the keywords a reactive
/// node needs checked against its own effective schema and own instance
/// value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicValidator;

impl BasicValidator {
    fn collect(self, request: &ValidateRequest<'_>) -> Vec<ValidationError> {
        let ValidateRequest {
            schema,
            instance,
            instance_location,
            keyword_location,
        } = *request;
        let mut errors = Vec::new();
        errors.extend(keyword::check_type(schema, instance, instance_location, keyword_location));
        errors.extend(keyword::check_enum(schema, instance, instance_location, keyword_location));
        errors.extend(keyword::check_const(schema, instance, instance_location, keyword_location));
        errors.extend(keyword::check_required(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_numeric(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_string(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_array(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_object(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_properties(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_pattern_properties(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_items(
            schema,
            instance,
            instance_location,
            keyword_location,
        ));
        errors.extend(keyword::check_not(schema, instance, instance_location, keyword_location));
        errors
    }
}

impl Validate for BasicValidator {
    fn validate(&self, request: ValidateRequest<'_>) -> ValidationOutput {
        let errors = self.collect(&request);
        let error = errors.first().map(|e| e.error.clone());
        ValidationOutput {
            valid: errors.is_empty(),
            errors,
            error,
        }
    }
}
