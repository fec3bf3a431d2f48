//! # Validation Engine
//!
//! Structural validation of a candidate document against a [`Schema`].
//!
//! Validation runs in three steps and stops at the first violated rule:
//! 1. Required attributes and required groups
//! 2. Whitelist check, only when `optional` is restrictive
//! 3. Recursion into sub-model attributes
//!
//! Validation never mutates its input. Bad data yields
//! `DocgateError::Validation`; a bad schema yields
//! `DocgateError::Configuration`.

use crate::schema::{AttributeSpec, GroupMode, Schema, unknown_mode};
use crate::{DocgateError, Document};
use serde_json::Value;
use std::collections::BTreeSet;

/// The Validator checks documents against schemas.
pub struct Validator;

impl Validator {
    /// Validate `document` against `schema`.
    ///
    /// Returns the document itself on success.
    ///
    /// # Errors
    /// - `DocgateError::Validation` if the document breaks a rule
    /// - `DocgateError::Configuration` if the schema uses an illegal group mode
    pub fn validate<'a>(
        schema: &Schema,
        document: &'a Document,
    ) -> Result<&'a Document, DocgateError> {
        Self::check_required(schema, document)?;

        if let Some(optional) = schema.optional() {
            Self::check_allowed(schema, optional, document)?;
        }

        Self::check_nested(schema, document)?;

        Ok(document)
    }

    /// Step 1: every required name and required group is satisfied.
    fn check_required(schema: &Schema, document: &Document) -> Result<(), DocgateError> {
        for spec in schema.required() {
            match spec {
                AttributeSpec::Name(name) => {
                    if !document.contains_key(name) {
                        return Err(DocgateError::Validation(format!(
                            "'{}' is missing required attribute '{}'",
                            schema.name(),
                            name
                        )));
                    }
                }
                AttributeSpec::Group { mode, names } => {
                    let present = count_present(names, document);
                    let satisfied = match mode {
                        GroupMode::OneOf => present >= 1,
                        GroupMode::EitherOf => present == 1,
                        other => return Err(unknown_mode(schema, "required", other)),
                    };

                    if !satisfied {
                        return Err(DocgateError::Validation(format!(
                            "'{}' requires {} but {} present",
                            schema.name(),
                            spec,
                            present
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Step 2: every key outside the required set is whitelisted.
    fn check_allowed(
        schema: &Schema,
        optional: &[AttributeSpec],
        document: &Document,
    ) -> Result<(), DocgateError> {
        for spec in optional {
            if let AttributeSpec::Group { mode, .. } = spec
                && !matches!(mode, GroupMode::AllOf | GroupMode::EitherOf)
            {
                return Err(unknown_mode(schema, "optional", mode));
            }
        }

        let required = schema.required_names();

        for key in document.keys() {
            if required.contains(key.as_str()) {
                continue;
            }

            let Some(spec) = optional
                .iter()
                .find(|spec| spec.names().any(|name| name == key.as_str()))
            else {
                return Err(DocgateError::Validation(format!(
                    "'{}' does not allow attribute '{}'",
                    schema.name(),
                    key
                )));
            };

            if let AttributeSpec::Group { mode, names } = spec {
                let allowed = match mode {
                    GroupMode::AllOf => names.iter().all(|name| document.contains_key(name)),
                    GroupMode::EitherOf => names
                        .iter()
                        .filter(|name| *name != key)
                        .all(|name| !document.contains_key(name)),
                    other => return Err(unknown_mode(schema, "optional", other)),
                };

                if !allowed {
                    return Err(DocgateError::Validation(format!(
                        "'{}': attribute '{}' violates {}",
                        schema.name(),
                        key,
                        spec
                    )));
                }
            }
        }

        Ok(())
    }

    /// Step 3: nested documents satisfy their sub-model.
    fn check_nested(schema: &Schema, document: &Document) -> Result<(), DocgateError> {
        for (attribute, nested) in schema.sub_models() {
            let Some(value) = document.get(attribute) else {
                continue;
            };
            let nested = nested.get()?;

            match value {
                Value::Object(inner) => {
                    Self::validate(&nested, inner)?;
                }
                Value::Array(items) => {
                    for item in items {
                        match item {
                            Value::Object(inner) => {
                                Self::validate(&nested, inner)?;
                            }
                            _ => Self::check_foreign_key(schema, attribute)?,
                        }
                    }
                }
                _ => Self::check_foreign_key(schema, attribute)?,
            }
        }

        Ok(())
    }

    /// A scalar under a sub-model attribute is only legal as a foreign key.
    fn check_foreign_key(schema: &Schema, attribute: &str) -> Result<(), DocgateError> {
        if schema.is_resolved(attribute) {
            return Ok(());
        }

        Err(DocgateError::Validation(format!(
            "'{}': attribute '{}' must hold a document",
            schema.name(),
            attribute
        )))
    }
}

/// Number of distinct `names` present in `document`.
fn count_present(names: &[String], document: &Document) -> usize {
    names
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|name| document.contains_key(name.as_str()))
        .count()
}

// =============================================================================
// TESTS
// =============================================================================
