//! # Engine Primitives
//!
//! Hardcoded runtime constants for the docgate engines.
//! These are compiled in and immutable at runtime.

/// Hard ceiling for foreign-key resolution depth.
///
/// - Requested depths above this are clamped.
/// - Bounds worst-case expansion for deep or cyclic reference chains.
pub const MAX_RESOLVE_DEPTH: usize = 3;

/// Resolution depth used when the caller does not ask for one.
pub const DEFAULT_RESOLVE_DEPTH: usize = 1;

/// Tag for the "at least one of" compound group.
pub const ONE_OF: &str = "one_of";

/// Tag for the "exactly one of" compound group.
pub const EITHER_OF: &str = "either_of";

/// Tag for the "all or nothing" compound group.
pub const ALL_OF: &str = "all_of";
