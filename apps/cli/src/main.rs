//! contextual — host harness for contextual bid request enrichment.
//!
//! Reads an OpenRTB bid request, enriches its site with the page's
//! classification, and prints the result.

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
