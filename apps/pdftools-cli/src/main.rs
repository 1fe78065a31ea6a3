//! pdftools binary
//!
//! Logs go to stderr; stdout carries only results (written paths, page
//! info, batch reports).

use clap::Parser;
use pdftools_cli::cli::Cli;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins when set; otherwise --verbose picks the level
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("pdftools v{}", env!("CARGO_PKG_VERSION"));

    // Exit directly: a timed-out job still occupies a blocking thread and
    // dropping the runtime would wait for it.
    match pdftools_cli::run(cli).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
