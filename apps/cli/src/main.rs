//! studybundle CLI — knowledge-bundle assembly and solution generation for
//! academic tasks.
//!
//! Harvests a task's supplementary sources (links, video transcripts)
//! concurrently, normalizes them into one ordered text bundle, and generates
//! a solution artifact through a generation collaborator.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
