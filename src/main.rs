//! Main entry point for the packpress server.
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! serves the optimization API until the process is stopped.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use packpress::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    packpress::server::serve(cli.bind, cli.production).await
}
