//! # CLI Command Implementations
//!
//! Each command loads its inputs, runs one engine and returns the resulting
//! JSON. Printing is left to the caller.

use crate::store::JsonStore;
use docgate_core::{
    AttributeSpec, DocgateError, Document, LookupCatalog, Merger, ResolveOptions, Resolver, Schema,
    SchemaRegistry, Validator,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size of a document or store file (100 MB).
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Resolve `path` to an existing regular file within the size limit.
fn validate_file_path(path: &Path) -> Result<PathBuf, DocgateError> {
    let canonical = path.canonicalize().map_err(|e| {
        DocgateError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(DocgateError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| DocgateError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(DocgateError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }

    Ok(canonical)
}

// =============================================================================
// LOADING
// =============================================================================

/// Load the schema registry, wiring lookups from the optional fixture store.
///
/// Without a store, schemas that resolve attributes fail to load because
/// their lookups are unknown.
pub fn load_registry(schemas: &Path, store: Option<&Path>) -> Result<SchemaRegistry, DocgateError> {
    let lookups = match store {
        Some(path) => JsonStore::from_path(validate_file_path(path)?)?.catalog(),
        None => LookupCatalog::new(),
    };

    SchemaRegistry::from_path(validate_file_path(schemas)?, &lookups)
}

/// Read a JSON document from `path`.
///
/// A file that is not JSON is an I/O problem; JSON that is not an object is
/// invalid data.
pub fn read_document(path: &Path) -> Result<Document, DocgateError> {
    let path = validate_file_path(path)?;
    let source = std::fs::read_to_string(&path).map_err(|e| {
        DocgateError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;

    match serde_json::from_str(&source) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(DocgateError::Validation(format!(
            "'{}' does not contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(DocgateError::IoError(format!(
            "Invalid JSON in '{}': {}",
            path.display(),
            e
        ))),
    }
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Rule summary of one schema.
fn summarize(schema: &Schema) -> Value {
    let specs = |list: &[AttributeSpec]| -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    };

    let sub_models: serde_json::Map<String, Value> = schema
        .sub_models()
        .iter()
        .map(|(attribute, nested)| (attribute.clone(), json!(nested.name())))
        .collect();

    let resolved: serde_json::Map<String, Value> = schema
        .resolved_attributes()
        .keys()
        .map(|attribute| {
            let target = schema.target_model(attribute).map(|s| s.name().to_string());
            (attribute.clone(), json!(target))
        })
        .collect();

    json!({
        "name": schema.name(),
        "required": specs(schema.required()),
        "optional": schema.optional().map(specs),
        "immutable": schema.immutable(),
        "private": schema.private(),
        "sub_models": sub_models,
        "resolve": resolved,
    })
}

/// List every registered schema with its rules.
pub fn cmd_check(registry: &SchemaRegistry) -> Result<Value, DocgateError> {
    let mut schemas = Vec::with_capacity(registry.len());
    for name in registry.names() {
        schemas.push(summarize(&*registry.require(name)?));
    }
    tracing::info!(schemas = schemas.len(), "schema registry is consistent");
    Ok(Value::Array(schemas))
}

// =============================================================================
// ENGINE COMMANDS
// =============================================================================

/// Validate a document against `model`.
pub fn cmd_validate(
    registry: &SchemaRegistry,
    model: &str,
    input: &Path,
) -> Result<Value, DocgateError> {
    let schema = registry.require(model)?;
    let document = read_document(input)?;

    Validator::validate(&schema, &document)?;
    tracing::info!(model, "document is valid");
    Ok(Value::Object(document))
}

/// Apply a proposed update to a stored document.
pub fn cmd_merge(
    registry: &SchemaRegistry,
    model: &str,
    stored: &Path,
    proposed: &Path,
) -> Result<Value, DocgateError> {
    let schema = registry.require(model)?;
    let stored = read_document(stored)?;
    let proposed = read_document(proposed)?;

    let merged = Merger::merge(&schema, &stored, &proposed)?;
    Ok(Value::Object(merged))
}

/// Remove private attributes from a document.
pub fn cmd_strip(
    registry: &SchemaRegistry,
    model: &str,
    input: &Path,
) -> Result<Value, DocgateError> {
    let schema = registry.require(model)?;
    let document = read_document(input)?;
    Ok(Value::Object(schema.strip_private(&document)))
}

/// Expand foreign keys of a document.
pub fn cmd_resolve(
    registry: &SchemaRegistry,
    model: &str,
    input: &Path,
    options: ResolveOptions,
) -> Result<Value, DocgateError> {
    let schema = registry.require(model)?;
    let document = read_document(input)?;

    let resolved = Resolver::resolve(&schema, &document, options)?;
    Ok(Value::Object(resolved))
}
