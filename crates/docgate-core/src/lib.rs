//! # docgate-core
//!
//! Schema validation, merge and resolution engine for docgate - THE LOGIC.
//!
//! This crate sits between a REST layer and a schema-less document store.
//! It never talks to the store itself; it transforms documents:
//! - `Validator` checks request payloads against a [`Schema`]
//! - `Merger` applies an update to a stored document, protecting immutable
//!   attributes and foreign keys
//! - [`Schema::strip_private`] removes private attributes from responses
//! - `Resolver` expands foreign keys into embedded documents through
//!   pluggable [`LookupStrategy`]s, with bounded depth
//!
//! ## Architectural Constraints
//!
//! - Synchronous and stateless: engines are unit structs
//! - Non-mutating: inputs are borrowed, results are new documents
//! - Fail-fast: the first violated rule is the error returned
//! - Schemas are read-only after configuration and shared through `Arc`;
//!   a registry binds references by name, so schemas may be self-referential

// =============================================================================
// MODULES
// =============================================================================

pub mod lookup;
pub mod merge;
pub mod primitives;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{DocgateError, Document, is_document_shape};

// =============================================================================
// RE-EXPORTS: Schemas & Lookups
// =============================================================================

pub use lookup::{BoundMethod, DocumentSource, LookupStrategy};
pub use registry::{LookupCatalog, SchemaRegistry};
pub use schema::{
    AttributeSpec, GroupMode, ResolvedAttribute, Schema, SchemaBuilder, SchemaRef,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use merge::Merger;
pub use resolver::{ResolveOptions, Resolver};
pub use validation::Validator;

// =============================================================================
// RE-EXPORTS: Primitives
// =============================================================================

pub use primitives::{DEFAULT_RESOLVE_DEPTH, MAX_RESOLVE_DEPTH};
