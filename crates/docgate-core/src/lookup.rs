//! # Lookup Strategies
//!
//! Pluggable capability mapping a foreign key to a target document.
//!
//! A strategy is one of three shapes:
//! - a plain function of the key
//! - a source bound to a pre-built instance (a shared, pre-configured client)
//! - a source constructed fresh for every call from stored constructor
//!   arguments (a per-call client)
//!
//! All three expose the same `invoke`. Found and not-found are explicit:
//! `Ok(None)` means "not found", while `Ok(Some(doc))` is found even when
//! `doc` is empty.

use crate::{DocgateError, Document};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// DOCUMENT SOURCE TRAIT
// =============================================================================

/// A collaborator able to fetch a document by foreign key.
///
/// Implemented by DAOs, storage clients and test doubles outside the core.
/// Implementations own their I/O policy (timeouts, retries); the engine
/// treats every call as an opaque synchronous operation.
pub trait DocumentSource: Send + Sync {
    /// Fetch the document referenced by `key`.
    fn find(&self, key: &Value) -> Result<Option<Document>, DocgateError>;
}

/// Adapter binding a method to an instance.
///
/// Lets any type act as a [`DocumentSource`] through one of its methods
/// without implementing the trait itself.
pub struct BoundMethod<T> {
    instance: Arc<T>,
    method: fn(&T, &Value) -> Result<Option<Document>, DocgateError>,
}

impl<T> BoundMethod<T> {
    /// Bind `method` to `instance`.
    #[must_use]
    pub fn new(
        instance: Arc<T>,
        method: fn(&T, &Value) -> Result<Option<Document>, DocgateError>,
    ) -> Self {
        Self { instance, method }
    }
}

impl<T: Send + Sync> DocumentSource for BoundMethod<T> {
    fn find(&self, key: &Value) -> Result<Option<Document>, DocgateError> {
        (self.method)(&self.instance, key)
    }
}

// =============================================================================
// LOOKUP STRATEGY
// =============================================================================

/// Plain lookup function.
pub type LookupFn = Arc<dyn Fn(&Value) -> Option<Document> + Send + Sync>;

/// Builds a fresh source from constructor arguments.
pub type SourceFactory =
    Arc<dyn Fn(&Document) -> Result<Box<dyn DocumentSource>, DocgateError> + Send + Sync>;

/// How a resolved attribute finds its target document.
#[derive(Clone)]
pub enum LookupStrategy {
    /// Free function of the key.
    Function(LookupFn),
    /// Source bound to a shared, pre-built instance.
    Instance(Arc<dyn DocumentSource>),
    /// Source built per call by `factory(&args)`.
    Constructed {
        /// Constructor for the per-call source.
        factory: SourceFactory,
        /// Arguments handed to the constructor on every call.
        args: Document,
    },
}

impl LookupStrategy {
    /// Strategy backed by a plain function.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<Document> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Strategy backed by an owned source instance.
    pub fn instance<S>(source: S) -> Self
    where
        S: DocumentSource + 'static,
    {
        Self::Instance(Arc::new(source))
    }

    /// Strategy backed by a source that is shared with other callers.
    #[must_use]
    pub fn shared(source: Arc<dyn DocumentSource>) -> Self {
        Self::Instance(source)
    }

    /// Strategy calling `method` on a shared `instance`.
    pub fn bound<T>(
        instance: Arc<T>,
        method: fn(&T, &Value) -> Result<Option<Document>, DocgateError>,
    ) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::instance(BoundMethod::new(instance, method))
    }

    /// Strategy constructing a fresh source from `args` on every call.
    pub fn constructed<F>(factory: F, args: Document) -> Self
    where
        F: Fn(&Document) -> Result<Box<dyn DocumentSource>, DocgateError> + Send + Sync + 'static,
    {
        Self::Constructed {
            factory: Arc::new(factory),
            args,
        }
    }

    /// Look up the document referenced by `key`.
    pub fn invoke(&self, key: &Value) -> Result<Option<Document>, DocgateError> {
        match self {
            Self::Function(f) => Ok(f(key)),
            Self::Instance(source) => source.find(key),
            Self::Constructed { factory, args } => factory(args)?.find(key),
        }
    }

    /// Short name of the strategy shape, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Function(_) => "function",
            Self::Instance(_) => "instance",
            Self::Constructed { .. } => "constructed",
        }
    }
}

impl fmt::Debug for LookupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructed { args, .. } => f
                .debug_struct("LookupStrategy::Constructed")
                .field("args", args)
                .finish_non_exhaustive(),
            other => write!(f, "LookupStrategy::{}", other.kind()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
