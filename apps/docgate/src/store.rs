//! # Fixture Store
//!
//! A read-only, file-backed document store used by the CLI to feed lookups.
//!
//! The file is a JSON object of collections, each an object of documents by
//! key:
//!
//! ```json
//! {
//!   "addresses": { "fk1": { "street": "Bakerstreet", "city": "London" } },
//!   "companies": { "acme": { "name": "Acme", "address": "fk1" } }
//! }
//! ```
//!
//! Every collection becomes a lookup strategy named after it, so a schema
//! file can say `lookup = "addresses"`.

use docgate_core::types::display_key;
use docgate_core::{DocgateError, Document, DocumentSource, LookupCatalog, LookupStrategy};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// COLLECTION SOURCE
// =============================================================================

/// One collection of the store, queried by foreign key.
#[derive(Debug, Clone, Default)]
pub struct CollectionSource {
    documents: BTreeMap<String, Document>,
}

impl CollectionSource {
    /// Create a collection from documents by key.
    #[must_use]
    pub fn new(documents: BTreeMap<String, Document>) -> Self {
        Self { documents }
    }

    /// Number of documents in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection holds no document.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentSource for CollectionSource {
    /// Keys are matched by their display form, so `7` and `"7"` find the
    /// same document.
    fn find(&self, key: &Value) -> Result<Option<Document>, DocgateError> {
        Ok(self.documents.get(&display_key(key)).cloned())
    }
}

// =============================================================================
// JSON STORE
// =============================================================================

/// All collections of a fixture file.
#[derive(Debug, Clone, Default)]
pub struct JsonStore {
    collections: BTreeMap<String, Arc<CollectionSource>>,
}

impl JsonStore {
    /// Parse a store from JSON source.
    ///
    /// # Errors
    /// Returns `DocgateError::Config` if the source is not valid JSON or not
    /// shaped as collections of documents.
    pub fn from_json_str(source: &str) -> Result<Self, DocgateError> {
        let root: Value = serde_json::from_str(source)
            .map_err(|e| DocgateError::Config(format!("Invalid store file: {}", e)))?;

        let Value::Object(collections) = root else {
            return Err(DocgateError::Config(
                "store file must be an object of collections".to_string(),
            ));
        };

        let mut store = Self::default();
        for (collection, documents) in collections {
            let Value::Object(documents) = documents else {
                return Err(DocgateError::Config(format!(
                    "collection '{}' must be an object of documents",
                    collection
                )));
            };

            let mut rows = BTreeMap::new();
            for (key, document) in documents {
                let Value::Object(document) = document else {
                    return Err(DocgateError::Config(format!(
                        "document '{}' in collection '{}' is not an object",
                        key, collection
                    )));
                };
                rows.insert(key, document);
            }

            store
                .collections
                .insert(collection, Arc::new(CollectionSource::new(rows)));
        }

        tracing::debug!(collections = store.collections.len(), "fixture store loaded");
        Ok(store)
    }

    /// Load a store from a JSON file.
    ///
    /// # Errors
    /// As [`from_json_str`](Self::from_json_str), plus `DocgateError::IoError`
    /// if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocgateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            DocgateError::IoError(format!("Cannot read store '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&source)
    }

    /// Collection registered under `name`.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<Arc<CollectionSource>> {
        self.collections.get(name).cloned()
    }

    /// One lookup strategy per collection, named after it.
    #[must_use]
    pub fn catalog(&self) -> LookupCatalog {
        let mut catalog = LookupCatalog::new();
        for (name, collection) in &self.collections {
            let source: Arc<dyn DocumentSource> = Arc::clone(collection) as Arc<dyn DocumentSource>;
            catalog.insert(name.as_str(), LookupStrategy::shared(source));
        }
        catalog
    }
}

// =============================================================================
// TESTS
// =============================================================================
