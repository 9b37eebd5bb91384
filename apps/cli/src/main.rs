//! SEO Studio CLI: crawl a site and generate SEO copy for its pages.
//!
//! Keeps each batch of pages in a local project table, fills in meta
//! descriptions and page text with Gemini, and exports the result.

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
