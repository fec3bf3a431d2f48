//! # Core Type Definitions
//!
//! This module contains the shared types for the docgate engines:
//! - The `Document` currency type
//! - Shape helpers used by validation, merge and resolution
//! - Error types (`DocgateError`)
//!
//! ## Documents
//!
//! A document is a schema-less mapping from attribute name to JSON value.
//! Shape is entirely schema-driven; no fixed record type exists.

use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// DOCUMENT
// =============================================================================

/// A schema-less mapping from attribute name to value.
///
/// Backed by `serde_json::Map`, so insertion order is preserved when the
/// workspace enables `preserve_order`.
pub type Document = Map<String, Value>;

/// Check whether a value looks like an embedded document rather than a raw
/// foreign key.
///
/// An object is a document. An array is a document shape as soon as one of
/// its elements is an object (a list of already-resolved references).
#[must_use]
pub fn is_document_shape(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(Value::is_object),
        _ => false,
    }
}

/// Render a foreign key for error messages.
///
/// Strings are shown without quotes, everything else as compact JSON.
#[must_use]
pub fn display_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the docgate engines.
///
/// - No silent failures
/// - The first violated rule is reported; errors are never accumulated
/// - Nothing is retried internally
#[derive(Debug, Error)]
pub enum DocgateError {
    /// The candidate document violates the schema's attribute rules.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The schema itself is malformed (schema authoring bug, not bad data).
    #[error("Schema configuration error: {0}")]
    Configuration(String),

    /// An update tried to change or remove an immutable attribute.
    #[error("Changing immutable attribute: {0}")]
    ChangingImmutableAttribute(String),

    /// Fail-fast resolution could not find the referenced document.
    #[error("Could not find object with id {key} for attribute {attribute}")]
    ResolvedObjectNotFound {
        /// The attribute holding the foreign key.
        attribute: String,
        /// The foreign key that could not be resolved.
        key: String,
    },

    /// A lookup collaborator failed while fetching a document.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// A configuration file could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl DocgateError {
    /// Whether the error was caused by the caller's data.
    ///
    /// Client errors map to 4xx-style responses. Everything else is a
    /// deployment or collaborator fault and should be surfaced loudly.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::ChangingImmutableAttribute(_)
                | Self::ResolvedObjectNotFound { .. }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
