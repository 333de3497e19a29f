//! helpsync CLI: incremental help-center to indexing-service sync.
//!
//! Lists help-center articles, normalizes them to Markdown, writes the ones
//! whose content changed since the last run, and uploads those to an
//! OpenAI-compatible files API.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
