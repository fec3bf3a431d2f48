//! # Schema Descriptors
//!
//! Per-entity-type declaration of the attribute rules the engines enforce.
//!
//! A `Schema` is plain data built once at configuration time and shared
//! read-only afterwards (`Arc<Schema>`). Other schemas are reached through
//! [`SchemaRef`]s: either owned outright, or bound by name through a
//! [`SchemaRegistry`](crate::SchemaRegistry), which lets a schema reference
//! itself (`person.manager -> person`) or close a cycle with another one.
//!
//! ## Attribute specs
//!
//! `required` and `optional` hold [`AttributeSpec`]s: either a bare name or a
//! compound group `(mode, names)`. Which modes are legal depends on the list:
//!
//! | List       | Legal modes              |
//! |------------|--------------------------|
//! | `required` | `one_of`, `either_of`    |
//! | `optional` | `all_of`, `either_of`    |
//!
//! Anything else is a schema authoring bug and surfaces as
//! `DocgateError::Configuration` when the engine meets it.

use crate::lookup::LookupStrategy;
use crate::primitives::{ALL_OF, EITHER_OF, ONE_OF};
use crate::{DocgateError, Document};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

// =============================================================================
// ATTRIBUTE SPECS
// =============================================================================

/// Mode tag of a compound attribute group.
///
/// Unknown tags are kept rather than rejected at parse time, so the engine
/// can tell a bad schema apart from bad data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupMode {
    /// At least one name present.
    OneOf,
    /// Exactly one name present.
    EitherOf,
    /// All names present, or none.
    AllOf,
    /// A tag the engine does not know.
    Unrecognized(String),
}

impl GroupMode {
    /// Parse a mode tag.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            ONE_OF => Self::OneOf,
            EITHER_OF => Self::EitherOf,
            ALL_OF => Self::AllOf,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The mode tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OneOf => ONE_OF,
            Self::EitherOf => EITHER_OF,
            Self::AllOf => ALL_OF,
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of a `required` or `optional` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSpec {
    /// A bare attribute name.
    Name(String),
    /// A compound group of names governed by `mode`.
    Group {
        /// How many of `names` may or must be present.
        mode: GroupMode,
        /// The grouped attribute names.
        names: Vec<String>,
    },
}

impl AttributeSpec {
    /// Bare attribute name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Compound group with an arbitrary mode.
    pub fn group<I, S>(mode: GroupMode, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Group {
            mode,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// At least one of `names`.
    pub fn one_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::group(GroupMode::OneOf, names)
    }

    /// Exactly one of `names`.
    pub fn either_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::group(GroupMode::EitherOf, names)
    }

    /// All of `names`, or none of them.
    pub fn all_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::group(GroupMode::AllOf, names)
    }

    /// Every attribute name this entry mentions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            Self::Name(name) => std::slice::from_ref(name),
            Self::Group { names, .. } => names,
        };
        names.iter().map(String::as_str)
    }
}

impl From<&str> for AttributeSpec {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for AttributeSpec {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Group { mode, names } => write!(f, "{}({})", mode, names.join(", ")),
        }
    }
}

// =============================================================================
// SCHEMA REFERENCES
// =============================================================================

/// Reference from one schema to another.
///
/// An owned reference keeps its target alive. A reference handed out by
/// [`SchemaRegistry::reference`](crate::SchemaRegistry::reference) names its
/// target, is bound when that schema is registered and holds it weakly, so
/// self-referential and mutually referential schemas do not leak. It stays
/// usable while the registry that bound it is alive.
#[derive(Clone)]
pub struct SchemaRef {
    target: Target,
}

#[derive(Clone)]
enum Target {
    Owned(Arc<Schema>),
    Named {
        name: String,
        slot: Arc<OnceLock<Weak<Schema>>>,
    },
}

impl SchemaRef {
    /// Reference to `name`, bound later.
    pub(crate) fn unbound(name: impl Into<String>) -> Self {
        Self {
            target: Target::Named {
                name: name.into(),
                slot: Arc::new(OnceLock::new()),
            },
        }
    }

    /// Bind a named reference to its registered schema. First binding wins.
    pub(crate) fn bind(&self, schema: &Arc<Schema>) {
        if let Target::Named { slot, .. } = &self.target {
            let _ = slot.set(Arc::downgrade(schema));
        }
    }

    /// Name of the target schema.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.target {
            Target::Owned(schema) => schema.name(),
            Target::Named { name, .. } => name,
        }
    }

    /// Whether the target can be reached.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        match &self.target {
            Target::Owned(_) => true,
            Target::Named { slot, .. } => slot.get().is_some_and(|weak| weak.strong_count() > 0),
        }
    }

    /// The target schema.
    ///
    /// # Errors
    /// Returns `DocgateError::Configuration` if the name was never
    /// registered, or its registry has been dropped.
    pub fn get(&self) -> Result<Arc<Schema>, DocgateError> {
        match &self.target {
            Target::Owned(schema) => Ok(Arc::clone(schema)),
            Target::Named { name, slot } => {
                slot.get().and_then(Weak::upgrade).ok_or_else(|| {
                    DocgateError::Configuration(format!(
                        "schema '{}' is referenced but not registered",
                        name
                    ))
                })
            }
        }
    }
}

impl From<Arc<Schema>> for SchemaRef {
    fn from(schema: Arc<Schema>) -> Self {
        Self {
            target: Target::Owned(schema),
        }
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaRef").field(&self.name()).finish()
    }
}

// =============================================================================
// RESOLVED ATTRIBUTES
// =============================================================================

/// Resolution config of one attribute: how to look it up and which schema
/// governs the document found.
#[derive(Debug, Clone)]
pub struct ResolvedAttribute {
    /// How the foreign key is turned into a document.
    pub lookup: LookupStrategy,
    /// Target schema; falls back to the matching `sub_models` entry.
    pub model: Option<SchemaRef>,
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Attribute rules of one entity type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    name: String,
    required: Vec<AttributeSpec>,
    optional: Option<Vec<AttributeSpec>>,
    immutable: BTreeSet<String>,
    private: BTreeSet<String>,
    sub_models: BTreeMap<String, SchemaRef>,
    resolved: BTreeMap<String, ResolvedAttribute>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Schema without any rule. Every document is valid against it.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Entity type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required attribute specs.
    #[must_use]
    pub fn required(&self) -> &[AttributeSpec] {
        &self.required
    }

    /// Optional attribute specs; `None` means unrestricted.
    #[must_use]
    pub fn optional(&self) -> Option<&[AttributeSpec]> {
        self.optional.as_deref()
    }

    /// Whether extra attributes must be whitelisted by `optional`.
    #[must_use]
    pub fn is_restrictive(&self) -> bool {
        self.optional.is_some()
    }

    /// Immutable attribute names.
    #[must_use]
    pub fn immutable(&self) -> &BTreeSet<String> {
        &self.immutable
    }

    /// Private attribute names.
    #[must_use]
    pub fn private(&self) -> &BTreeSet<String> {
        &self.private
    }

    /// Nested schemas by attribute name.
    #[must_use]
    pub fn sub_models(&self) -> &BTreeMap<String, SchemaRef> {
        &self.sub_models
    }

    /// Resolution config by attribute name.
    #[must_use]
    pub fn resolved_attributes(&self) -> &BTreeMap<String, ResolvedAttribute> {
        &self.resolved
    }

    /// Whether `attribute` holds a foreign key.
    #[must_use]
    pub fn is_resolved(&self, attribute: &str) -> bool {
        self.resolved.contains_key(attribute)
    }

    /// Schema governing the document `attribute` resolves to.
    #[must_use]
    pub fn target_model(&self, attribute: &str) -> Option<&SchemaRef> {
        self.resolved
            .get(attribute)
            .and_then(|r| r.model.as_ref())
            .or_else(|| self.sub_models.get(attribute))
    }

    /// Union of bare required names and every required group's names.
    #[must_use]
    pub fn required_names(&self) -> BTreeSet<&str> {
        self.required.iter().flat_map(|spec| spec.names()).collect()
    }

    /// Copy of `document` without private attributes.
    ///
    /// Recurses into sub-model attributes holding a document or a list of
    /// documents. Never mutates the input; applying it twice is the same as
    /// applying it once. A sub-model attribute whose schema cannot be reached
    /// is withheld entirely.
    #[must_use]
    pub fn strip_private(&self, document: &Document) -> Document {
        let mut stripped = Document::new();

        for (key, value) in document {
            if self.private.contains(key.as_str()) {
                continue;
            }

            let value = match self.sub_models.get(key) {
                None => value.clone(),
                Some(nested) => match nested.get() {
                    Ok(nested) => nested.strip_value(value),
                    Err(e) => {
                        tracing::warn!(
                            schema = %self.name,
                            attribute = %key,
                            error = %e,
                            "sub-model unavailable, attribute withheld"
                        );
                        continue;
                    }
                },
            };
            stripped.insert(key.clone(), value);
        }

        stripped
    }

    fn strip_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(doc) => Value::Object(self.strip_private(doc)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.strip_value(item)).collect())
            }
            other => other.clone(),
        }
    }

    /// Report group modes the engine would reject.
    ///
    /// Only this schema's own lists are checked; nested schemas are checked
    /// when they are registered.
    pub fn check(&self) -> Result<(), DocgateError> {
        for spec in &self.required {
            if let AttributeSpec::Group { mode, .. } = spec
                && !matches!(mode, GroupMode::OneOf | GroupMode::EitherOf)
            {
                return Err(unknown_mode(self, "required", mode));
            }
        }

        for spec in self.optional.iter().flatten() {
            if let AttributeSpec::Group { mode, .. } = spec
                && !matches!(mode, GroupMode::AllOf | GroupMode::EitherOf)
            {
                return Err(unknown_mode(self, "optional", mode));
            }
        }

        Ok(())
    }
}

/// Configuration error for a mode tag that is illegal in `list`.
pub(crate) fn unknown_mode(schema: &Schema, list: &str, mode: &GroupMode) -> DocgateError {
    DocgateError::Configuration(format!(
        "schema '{}': unknown {} group mode '{}'",
        schema.name, list, mode
    ))
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            schema: Schema::empty(name),
        }
    }

    /// Add a required spec.
    #[must_use]
    pub fn required(mut self, spec: impl Into<AttributeSpec>) -> Self {
        self.schema.required.push(spec.into());
        self
    }

    /// Add an optional spec. Switches the schema to whitelist mode.
    #[must_use]
    pub fn optional(mut self, spec: impl Into<AttributeSpec>) -> Self {
        self.schema
            .optional
            .get_or_insert_with(Vec::new)
            .push(spec.into());
        self
    }

    /// Switch to whitelist mode without adding an optional spec.
    #[must_use]
    pub fn restrictive(mut self) -> Self {
        self.schema.optional.get_or_insert_with(Vec::new);
        self
    }

    /// Mark an attribute immutable.
    #[must_use]
    pub fn immutable(mut self, name: impl Into<String>) -> Self {
        self.schema.immutable.insert(name.into());
        self
    }

    /// Mark an attribute private.
    #[must_use]
    pub fn private(mut self, name: impl Into<String>) -> Self {
        self.schema.private.insert(name.into());
        self
    }

    /// Govern a nested document with `schema`.
    #[must_use]
    pub fn sub_model(mut self, name: impl Into<String>, schema: impl Into<SchemaRef>) -> Self {
        self.schema.sub_models.insert(name.into(), schema.into());
        self
    }

    /// Resolve an attribute, taking the target schema from `sub_models`.
    #[must_use]
    pub fn resolve(mut self, name: impl Into<String>, lookup: LookupStrategy) -> Self {
        self.schema.resolved.insert(
            name.into(),
            ResolvedAttribute {
                lookup,
                model: None,
            },
        );
        self
    }

    /// Resolve an attribute into documents governed by `model`.
    #[must_use]
    pub fn resolve_as(
        mut self,
        name: impl Into<String>,
        lookup: LookupStrategy,
        model: impl Into<SchemaRef>,
    ) -> Self {
        self.schema.resolved.insert(
            name.into(),
            ResolvedAttribute {
                lookup,
                model: Some(model.into()),
            },
        );
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    /// Returns `DocgateError::Configuration` if:
    /// - a name is both required and optional
    /// - a name appears in more than one optional entry
    /// - a resolved attribute has no target schema
    pub fn build(self) -> Result<Schema, DocgateError> {
        let schema = self.schema;

        if let Some(optional) = &schema.optional {
            let mut seen = BTreeSet::new();
            if let Some(name) = optional
                .iter()
                .flat_map(|spec| spec.names())
                .find(|name| !seen.insert(*name))
            {
                return Err(DocgateError::Configuration(format!(
                    "schema '{}': attribute '{}' appears in more than one optional entry",
                    schema.name, name
                )));
            }

            let required = schema.required_names();
            if let Some(name) = optional
                .iter()
                .flat_map(|spec| spec.names())
                .find(|name| required.contains(name))
            {
                return Err(DocgateError::Configuration(format!(
                    "schema '{}': attribute '{}' is both required and optional",
                    schema.name, name
                )));
            }
        }

        if let Some(name) = schema
            .resolved
            .keys()
            .find(|name| schema.target_model(name).is_none())
        {
            return Err(DocgateError::Configuration(format!(
                "schema '{}': resolved attribute '{}' has no target model",
                schema.name, name
            )));
        }

        Ok(schema)
    }
}

// =============================================================================
// TESTS
// =============================================================================
