//! geoinfer CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, dispatch to the
//! selected pipeline, and exit with appropriate status.
//! For programmatic use, prefer the library API (`geoinfer::api`).

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args).await
}
