//! Rewards CLI Entry Point
//!
//! Configuration is loaded from environment variables (via .env file).
//! Command-line arguments override environment variables.
//!
//! Usage:
//!   rewards run-window  - Ingest a ledger fixture and build a rewards window
//!   rewards verify      - Verify published recipient proofs
//!   rewards fee         - Fee decomposition arithmetic
//!   rewards schedules   - Show and digest-check tier and multiplier schedule versions
//!   rewards config      - Show the effective executor configuration

use clap::Parser;
use rewards_cli::{handler, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.verbose || std::env::var_os("RUST_LOG").is_some() {
        init_logging();
    }

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize logging with tracing
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rewards_cli=info,rewards_executor=info,rewards_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
