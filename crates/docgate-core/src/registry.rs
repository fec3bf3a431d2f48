//! # Schema Registry
//!
//! Process-wide table of schema descriptors, loaded once at configuration
//! time and read-only afterwards.
//!
//! Schemas can be registered in code or loaded from TOML. In TOML, nested
//! schemas and resolution targets are referenced by name and bound once the
//! whole file is registered, so a schema may reference itself or close a
//! cycle with another one. Lookup strategies are referenced by name and taken
//! from a [`LookupCatalog`] supplied by the storage layer.
//!
//! ```toml
//! [schemas.address]
//! required = ["street", "city", "plz"]
//! private = ["wifiPassword"]
//!
//! [schemas.person]
//! required = ["name", { one_of = ["email", "phone"] }]
//! optional = ["nickname", { all_of = ["phoneCarrier", "phoneModel"] }]
//! sub_models = { address = "address" }
//!
//! [schemas.person.resolve.address]
//! lookup = "addresses"
//! ```

use crate::lookup::LookupStrategy;
use crate::schema::{AttributeSpec, GroupMode, Schema, SchemaRef};
use crate::DocgateError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// LOOKUP CATALOG
// =============================================================================

/// Named lookup strategies available to TOML schema files.
#[derive(Debug, Clone, Default)]
pub struct LookupCatalog {
    strategies: BTreeMap<String, LookupStrategy>,
}

impl LookupCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under `name`, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, strategy: LookupStrategy) {
        self.strategies.insert(name.into(), strategy);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, strategy: LookupStrategy) -> Self {
        self.insert(name, strategy);
        self
    }

    /// Strategy registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LookupStrategy> {
        self.strategies.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }
}

// =============================================================================
// TOML FILE FORMAT
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    schemas: BTreeMap<String, SchemaEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaEntry {
    #[serde(default)]
    required: Vec<SpecEntry>,
    #[serde(default)]
    optional: Option<Vec<SpecEntry>>,
    #[serde(default)]
    immutable: Vec<String>,
    #[serde(default)]
    private: Vec<String>,
    #[serde(default)]
    sub_models: BTreeMap<String, String>,
    #[serde(default)]
    resolve: BTreeMap<String, ResolveEntry>,
}

/// Bare name, or a single-key table `{ <mode> = [names] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpecEntry {
    Name(String),
    Group(BTreeMap<String, Vec<String>>),
}

impl SpecEntry {
    fn to_spec(&self, schema: &str) -> Result<AttributeSpec, DocgateError> {
        match self {
            Self::Name(name) => Ok(AttributeSpec::name(name.as_str())),
            Self::Group(table) => {
                let mut entries = table.iter();
                match (entries.next(), entries.next()) {
                    (Some((mode, names)), None) => Ok(AttributeSpec::group(
                        GroupMode::parse(mode),
                        names.iter().map(String::as_str),
                    )),
                    _ => Err(DocgateError::Configuration(format!(
                        "schema '{}': a group must have exactly one mode, found {}",
                        schema,
                        table.len()
                    ))),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResolveEntry {
    lookup: String,
    #[serde(default)]
    model: Option<String>,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Schemas by entity type name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
    references: BTreeMap<String, SchemaRef>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema built in code.
    ///
    /// Binds every reference already handed out for its name.
    ///
    /// # Errors
    /// Returns `DocgateError::Configuration` if the name is taken or the
    /// schema uses an illegal group mode.
    pub fn register(&mut self, schema: Schema) -> Result<Arc<Schema>, DocgateError> {
        schema.check()?;

        if self.schemas.contains_key(schema.name()) {
            return Err(DocgateError::Configuration(format!(
                "schema '{}' is already registered",
                schema.name()
            )));
        }

        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.name().to_string(), Arc::clone(&schema));
        if let Some(reference) = self.references.get(schema.name()) {
            reference.bind(&schema);
        }
        Ok(schema)
    }

    /// Reference to the schema registered under `name`, now or later.
    ///
    /// This is how a schema refers to itself or to a schema that refers
    /// back to it. The reference is reachable while this registry (or a
    /// clone of it) is alive.
    pub fn reference(&mut self, name: &str) -> SchemaRef {
        let reference = self
            .references
            .entry(name.to_string())
            .or_insert_with(|| SchemaRef::unbound(name))
            .clone();
        if let Some(schema) = self.schemas.get(name) {
            reference.bind(schema);
        }
        reference
    }

    /// Check that every reference handed out names a registered schema.
    ///
    /// # Errors
    /// Returns `DocgateError::Configuration` naming the first unknown schema.
    pub fn verify_references(&self) -> Result<(), DocgateError> {
        match self.references.values().find(|reference| !reference.is_bound()) {
            Some(reference) => Err(DocgateError::Configuration(format!(
                "unknown schema reference '{}'",
                reference.name()
            ))),
            None => Ok(()),
        }
    }

    /// Load schemas from TOML source.
    ///
    /// # Errors
    /// - `DocgateError::Config` if the source is not a valid schema file
    /// - `DocgateError::Configuration` for unknown references, unknown
    ///   lookups and illegal group modes
    pub fn from_toml_str(source: &str, lookups: &LookupCatalog) -> Result<Self, DocgateError> {
        let file: SchemaFile =
            toml::from_str(source).map_err(|e| DocgateError::Config(e.to_string()))?;

        let mut registry = Self::new();
        for (name, entry) in &file.schemas {
            let schema = registry.build_entry(name, entry, lookups)?;
            registry.register(schema)?;
        }
        registry.verify_references()?;

        tracing::debug!(schemas = registry.len(), "schema registry loaded");
        Ok(registry)
    }

    /// Load schemas from a TOML file.
    ///
    /// # Errors
    /// As [`from_toml_str`](Self::from_toml_str), plus `DocgateError::IoError`
    /// if the file cannot be read.
    pub fn from_path(
        path: impl AsRef<Path>,
        lookups: &LookupCatalog,
    ) -> Result<Self, DocgateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            DocgateError::IoError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&source, lookups)
    }

    /// Build one file entry, referencing other schemas by name.
    fn build_entry(
        &mut self,
        name: &str,
        entry: &SchemaEntry,
        lookups: &LookupCatalog,
    ) -> Result<Schema, DocgateError> {
        let mut builder = Schema::builder(name);

        for spec in &entry.required {
            builder = builder.required(spec.to_spec(name)?);
        }
        if let Some(optional) = &entry.optional {
            builder = builder.restrictive();
            for spec in optional {
                builder = builder.optional(spec.to_spec(name)?);
            }
        }
        for attribute in &entry.immutable {
            builder = builder.immutable(attribute.as_str());
        }
        for attribute in &entry.private {
            builder = builder.private(attribute.as_str());
        }
        for (attribute, target) in &entry.sub_models {
            builder = builder.sub_model(attribute.as_str(), self.reference(target));
        }
        for (attribute, resolve) in &entry.resolve {
            let lookup = lookups.get(&resolve.lookup).cloned().ok_or_else(|| {
                DocgateError::Configuration(format!(
                    "schema '{}': attribute '{}' uses unknown lookup '{}'",
                    name, attribute, resolve.lookup
                ))
            })?;
            builder = match &resolve.model {
                Some(model) => {
                    builder.resolve_as(attribute.as_str(), lookup, self.reference(model))
                }
                None => builder.resolve(attribute.as_str(), lookup),
            };
        }

        builder.build()
    }

    /// Schema registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    /// Schema registered under `name`, or a configuration error.
    pub fn require(&self, name: &str) -> Result<Arc<Schema>, DocgateError> {
        self.get(name)
            .ok_or_else(|| DocgateError::Configuration(format!("unknown schema '{}'", name)))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
