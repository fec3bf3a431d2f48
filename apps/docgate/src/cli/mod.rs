//! # docgate CLI Module
//!
//! Command-line front end over the docgate engines.
//!
//! ## Available Commands
//!
//! - `check` - Load the schema file and list every schema
//! - `validate` - Validate a document against a schema
//! - `merge` - Apply an update to a stored document
//! - `strip` - Remove private attributes
//! - `resolve` - Expand foreign keys through the fixture store

mod commands;

use clap::{Parser, Subcommand};
use docgate_core::{DEFAULT_RESOLVE_DEPTH, DocgateError, ResolveOptions};
use serde_json::Value;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// docgate - schema gate for document stores
///
/// Validates, merges, filters and resolves JSON documents against the
/// schemas of a TOML registry.
#[derive(Parser, Debug)]
#[command(name = "docgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML schema registry
    #[arg(short = 'S', long, global = true, default_value = "schemas.toml")]
    pub schemas: PathBuf,

    /// JSON fixture store backing the lookups
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the registry and list every schema with its rules
    Check,

    /// Validate a document
    Validate {
        /// Schema name
        #[arg(short, long)]
        model: String,

        /// Document file (JSON object)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Merge a proposed update into a stored document
    Merge {
        /// Schema name
        #[arg(short, long)]
        model: String,

        /// Stored document file
        #[arg(short, long)]
        stored: PathBuf,

        /// Proposed update file
        #[arg(short, long)]
        proposed: PathBuf,
    },

    /// Remove private attributes from a document
    Strip {
        /// Schema name
        #[arg(short, long)]
        model: String,

        /// Document file (JSON object)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Expand foreign keys into embedded documents
    Resolve {
        /// Schema name
        #[arg(short, long)]
        model: String,

        /// Document file (JSON object)
        #[arg(short, long)]
        input: PathBuf,

        /// Resolution depth (capped at 3)
        #[arg(short, long, default_value_t = DEFAULT_RESOLVE_DEPTH)]
        depth: usize,

        /// Fail on the first unresolvable foreign key
        #[arg(long)]
        fail_fast: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Run the parsed command and return its JSON output.
pub fn run(cli: &Cli) -> Result<Value, DocgateError> {
    let registry = load_registry(&cli.schemas, cli.store.as_deref())?;

    match &cli.command {
        Some(Commands::Validate { model, input }) => cmd_validate(&registry, model, input),
        Some(Commands::Merge {
            model,
            stored,
            proposed,
        }) => cmd_merge(&registry, model, stored, proposed),
        Some(Commands::Strip { model, input }) => cmd_strip(&registry, model, input),
        Some(Commands::Resolve {
            model,
            input,
            depth,
            fail_fast,
        }) => {
            let options = ResolveOptions {
                depth: *depth,
                fail_fast: *fail_fast,
            };
            cmd_resolve(&registry, model, input, options)
        }
        // No subcommand - check the registry by default
        Some(Commands::Check) | None => cmd_check(&registry),
    }
}

/// Execute the CLI, printing the result as pretty JSON on stdout.
pub fn execute(cli: &Cli) -> Result<(), DocgateError> {
    let output = run(cli)?;
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|e| DocgateError::IoError(format!("Cannot render output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

/// Process exit code for a failed command.
///
/// Bad documents exit with 1; broken configuration, unreadable files and
/// failing collaborators exit with 2.
#[must_use]
pub fn exit_code(error: &DocgateError) -> i32 {
    if error.is_client_error() { 1 } else { 2 }
}

// =============================================================================
// TESTS
// =============================================================================
