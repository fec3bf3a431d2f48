//! # Merge Engine
//!
//! Combines a stored document with a proposed update.
//!
//! The proposed document is the new state: attributes it omits are dropped,
//! unless they are immutable, in which case the update is rejected. Two
//! protections apply on top of plain replacement:
//! - Immutable attributes may be set once and never changed or removed
//! - Resolved attributes never accept an embedded document; the stored
//!   foreign key wins, so a resolved response body sent back as an update
//!   cannot overwrite the reference with its expansion

use crate::schema::Schema;
use crate::types::is_document_shape;
use crate::validation::Validator;
use crate::{DocgateError, Document};
use serde_json::Value;

/// The Merger applies updates to stored documents.
pub struct Merger;

impl Merger {
    /// Merge `proposed` into `stored`, returning a new document.
    ///
    /// Neither input is mutated.
    ///
    /// # Errors
    /// - `DocgateError::Validation` / `Configuration` if `proposed` fails validation
    /// - `DocgateError::ChangingImmutableAttribute` if an immutable attribute
    ///   would change or disappear, at any nesting level
    pub fn merge(
        schema: &Schema,
        stored: &Document,
        proposed: &Document,
    ) -> Result<Document, DocgateError> {
        Validator::validate(schema, proposed)?;
        Self::merge_validated(schema, stored, proposed)
    }

    fn merge_validated(
        schema: &Schema,
        stored: &Document,
        proposed: &Document,
    ) -> Result<Document, DocgateError> {
        for name in schema.immutable() {
            if stored.contains_key(name) && !proposed.contains_key(name) {
                return Err(DocgateError::ChangingImmutableAttribute(format!(
                    "'{}': attribute '{}' cannot be removed",
                    schema.name(),
                    name
                )));
            }
        }

        let mut merged = Document::new();

        for (key, value) in proposed {
            if schema.immutable().contains(key)
                && stored.get(key).is_some_and(|old| old != value)
            {
                return Err(DocgateError::ChangingImmutableAttribute(format!(
                    "'{}': attribute '{}' cannot be changed",
                    schema.name(),
                    key
                )));
            }

            if schema.is_resolved(key) {
                if is_document_shape(value) {
                    // Expanded reference: keep the stored foreign key.
                    if let Some(old) = stored.get(key) {
                        merged.insert(key.clone(), old.clone());
                    }
                } else {
                    merged.insert(key.clone(), value.clone());
                }
                continue;
            }

            let value = match schema.sub_models().get(key) {
                Some(nested) => Self::merge_nested(&*nested.get()?, stored.get(key), value)?,
                None => value.clone(),
            };
            merged.insert(key.clone(), value);
        }

        for (attribute, nested) in schema.sub_models() {
            if schema.is_resolved(attribute) || proposed.contains_key(attribute) {
                continue;
            }
            if let Some(old) = stored.get(attribute) {
                Self::check_removal(&*nested.get()?, old)?;
            }
        }

        Ok(merged)
    }

    /// Merge one sub-model value.
    ///
    /// A missing stored side merges against an empty document. A stored side
    /// of another shape is replaced, which counts as removing it. Lists merge
    /// element-wise by position.
    fn merge_nested(
        schema: &Schema,
        stored: Option<&Value>,
        proposed: &Value,
    ) -> Result<Value, DocgateError> {
        match proposed {
            Value::Object(update) => {
                let empty = Document::new();
                let current = match stored {
                    Some(Value::Object(current)) => current,
                    Some(replaced) => {
                        Self::check_removal(schema, replaced)?;
                        &empty
                    }
                    None => &empty,
                };
                Ok(Value::Object(Self::merge_validated(
                    schema, current, update,
                )?))
            }
            Value::Array(updates) => {
                let current: &[Value] = match stored {
                    Some(Value::Array(current)) => current,
                    Some(replaced) => {
                        Self::check_removal(schema, replaced)?;
                        &[]
                    }
                    None => &[],
                };

                for dropped in current.iter().skip(updates.len()) {
                    Self::check_removal(schema, dropped)?;
                }

                updates
                    .iter()
                    .enumerate()
                    .map(|(i, update)| Self::merge_nested(schema, current.get(i), update))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            other => {
                if let Some(replaced) = stored {
                    Self::check_removal(schema, replaced)?;
                }
                Ok(other.clone())
            }
        }
    }

    /// Removing a whole sub-document is a change to every immutable
    /// attribute it carries.
    fn check_removal(schema: &Schema, removed: &Value) -> Result<(), DocgateError> {
        match removed {
            Value::Object(doc) => {
                if let Some(name) = schema.immutable().iter().find(|n| doc.contains_key(*n)) {
                    return Err(DocgateError::ChangingImmutableAttribute(format!(
                        "'{}': attribute '{}' cannot be removed",
                        schema.name(),
                        name
                    )));
                }
                for (attribute, nested) in schema.sub_models() {
                    if schema.is_resolved(attribute) {
                        continue;
                    }
                    if let Some(value) = doc.get(attribute) {
                        Self::check_removal(&*nested.get()?, value)?;
                    }
                }
                Ok(())
            }
            Value::Array(items) => items
                .iter()
                .try_for_each(|item| Self::check_removal(schema, item)),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
