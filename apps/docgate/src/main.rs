//! # docgate
//!
//! Command-line gate for schema-less document stores.
//!
//! ## Usage
//!
//! ```bash
//! # List the schemas of a registry
//! docgate --schemas schemas.toml check
//!
//! # Validate, merge, filter and resolve documents
//! docgate validate -m person -i person.json
//! docgate merge -m person -s stored.json -p update.json
//! docgate strip -m person -i person.json
//! docgate --store fixtures.json resolve -m person -i person.json --depth 2 --fail-fast
//! ```

use clap::Parser;
use docgate::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // DOCGATE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("DOCGATE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.quiet {
        "docgate=error"
    } else if cli.verbose {
        "docgate=debug"
    } else {
        "docgate=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries the JSON result.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(&cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(cli::exit_code(&e));
    }
}
