//! Pkgforge - assemble OS and container packages
//!
//! Entry point for the pkgforge command-line application.

use anyhow::Result;
use clap::Parser;

use pkgforge::cli::{output, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = cli.run().await {
        output::display_error(&e);
        std::process::exit(1);
    }
    Ok(())
}
