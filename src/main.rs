//! pimbench CLI
//!
//! Sweeps transfer sizes over a simulated processing-in-memory fleet and
//! writes one CSV row per benchmark per size.
//!
//! Logs go to stderr; set `RUST_LOG` to override the level.

use std::process::ExitCode;

use clap::Parser;
use pimbench::cli::{entrypoint, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match entrypoint(cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "benchmark failed");
            ExitCode::FAILURE
        },
    }
}
