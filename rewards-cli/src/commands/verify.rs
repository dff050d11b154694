//! Verify Commands

use clap::Subcommand;
use std::path::PathBuf;

/// Verify subcommands
#[derive(Subcommand, Debug)]
pub enum VerifyCommands {
    /// Check every recipient proof against a window artifact's root
    Proofs {
        /// Window artifact (window.json)
        #[arg(short, long)]
        window: PathBuf,

        /// Recipient artifacts (recipients.json)
        #[arg(short, long)]
        recipients: PathBuf,
    },
}
