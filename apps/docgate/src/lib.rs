//! # docgate
//!
//! Library half of the docgate binary: CLI parsing and commands, and the
//! JSON fixture store used to back lookups. The engines live in
//! `docgate-core`.

pub mod cli;
pub mod store;
