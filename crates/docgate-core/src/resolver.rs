//! # Resolution Engine
//!
//! Replaces foreign keys with the documents they reference.
//!
//! - Depth is bounded by `MAX_RESOLVE_DEPTH` whatever the caller asks for
//! - Resolved documents are stripped of private attributes before embedding
//! - Embedded documents are resolved again against their own schema, one
//!   level shallower, depth-first
//! - A missing target either fails the call (`fail_fast`) or leaves the raw
//!   foreign key in place

use crate::primitives::{DEFAULT_RESOLVE_DEPTH, MAX_RESOLVE_DEPTH};
use crate::schema::{ResolvedAttribute, Schema};
use crate::types::display_key;
use crate::{DocgateError, Document};
use serde_json::Value;

/// Options for a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Requested depth; clamped to `MAX_RESOLVE_DEPTH`.
    pub depth: usize,
    /// Fail on the first reference that cannot be found.
    pub fail_fast: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_RESOLVE_DEPTH,
            fail_fast: false,
        }
    }
}

impl ResolveOptions {
    /// Options with the given depth, lenient on misses.
    #[must_use]
    pub fn with_depth(depth: usize) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }

    /// Same options, failing fast on misses.
    #[must_use]
    pub fn fail_fast(self) -> Self {
        Self {
            fail_fast: true,
            ..self
        }
    }

    /// Depth actually used.
    #[must_use]
    pub fn effective_depth(&self) -> usize {
        self.depth.min(MAX_RESOLVE_DEPTH)
    }
}

/// The Resolver expands foreign keys into embedded documents.
pub struct Resolver;

impl Resolver {
    /// Resolve the foreign keys of `document` against `schema`.
    ///
    /// Returns a new document; the input is never mutated.
    ///
    /// # Errors
    /// - `DocgateError::ResolvedObjectNotFound` on a miss with `fail_fast`
    /// - Any error raised by a lookup collaborator, unchanged
    pub fn resolve(
        schema: &Schema,
        document: &Document,
        options: ResolveOptions,
    ) -> Result<Document, DocgateError> {
        let depth = options.effective_depth();
        if depth < options.depth {
            tracing::debug!(
                requested = options.depth,
                depth,
                "resolution depth clamped"
            );
        }

        Self::resolve_level(schema, document, depth, options.fail_fast)
    }

    fn resolve_level(
        schema: &Schema,
        document: &Document,
        depth: usize,
        fail_fast: bool,
    ) -> Result<Document, DocgateError> {
        if depth == 0 {
            return Ok(document.clone());
        }

        let mut resolved = Document::new();

        for (attribute, value) in document {
            let value = match schema.resolved_attributes().get(attribute) {
                Some(config) => {
                    let target = schema
                        .target_model(attribute)
                        .ok_or_else(|| {
                            DocgateError::Configuration(format!(
                                "schema '{}': resolved attribute '{}' has no target model",
                                schema.name(),
                                attribute
                            ))
                        })?
                        .get()?;

                    match value {
                        Value::Array(keys) => keys
                            .iter()
                            .map(|key| {
                                Self::resolve_reference(
                                    attribute, config, &target, key, depth, fail_fast,
                                )
                            })
                            .collect::<Result<Vec<_>, _>>()
                            .map(Value::Array)?,
                        key => Self::resolve_reference(
                            attribute, config, &target, key, depth, fail_fast,
                        )?,
                    }
                }
                None => value.clone(),
            };

            resolved.insert(attribute.clone(), value);
        }

        Ok(resolved)
    }

    /// Resolve a single foreign key.
    fn resolve_reference(
        attribute: &str,
        config: &ResolvedAttribute,
        target: &Schema,
        key: &Value,
        depth: usize,
        fail_fast: bool,
    ) -> Result<Value, DocgateError> {
        if key.is_object() {
            return Ok(key.clone());
        }

        tracing::trace!(
            attribute,
            key = %display_key(key),
            strategy = config.lookup.kind(),
            "looking up reference"
        );

        let Some(found) = config.lookup.invoke(key)? else {
            if fail_fast {
                return Err(DocgateError::ResolvedObjectNotFound {
                    attribute: attribute.to_string(),
                    key: display_key(key),
                });
            }

            tracing::debug!(attribute, key = %display_key(key), "reference left unresolved");
            return Ok(key.clone());
        };

        let public = target.strip_private(&found);
        let nested = Self::resolve_level(target, &public, depth - 1, fail_fast)?;

        Ok(Value::Object(nested))
    }
}

// =============================================================================
// TESTS
// =============================================================================
