//! ctxpack - Relevance-ranked, token-budgeted context packing for source trees
//!
//! ctxpack provides:
//! - Structural scanning (imports, bases, calls) for Python and heuristic languages
//! - Relationship scoring against target names, with an optional semantic oracle
//! - Depth-grouped greedy packing under a token ceiling, with summary fallback
//! - Output as json/jsonl/md

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backends;
mod cli;
mod core;
mod flows;
mod scanner;
mod scoring;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run(cli)
}
