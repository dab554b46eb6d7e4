//! rustle CLI entry point.

use anyhow::Context;
use rustle_lib::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();
    let command = format!("{:?}", cli.command);

    // Execute the command
    cli::execute(cli)
        .await
        .with_context(|| format!("rustle {command} failed"))
}
