//! CLI Commands Module
//!
//! Command definitions for the rewards CLI.

pub mod fee;
pub mod verify;
pub mod window;

use clap::{Parser, Subcommand};

/// Bridge rewards CLI
#[derive(Parser, Debug)]
#[command(name = "rewards")]
#[command(version)]
#[command(about = "Bridge rewards back office")]
#[command(long_about = "Builds Merkle distributor windows for bridge rewards.\n\n\
    Ingests on-chain records, prices deposits, aggregates referral, LP fee and \
    bridge fee rewards, and verifies published claim proofs.")]
pub struct Cli {
    /// Merkle distributor chain (env: REWARDS_CHAIN_ID)
    #[arg(long, env = "REWARDS_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Merkle distributor contract (env: REWARDS_CONTRACT_ADDRESS)
    #[arg(long, env = "REWARDS_CONTRACT_ADDRESS")]
    pub contract: Option<String>,

    /// Reward token paid out by windows (env: REWARDS_REWARD_TOKEN)
    #[arg(long, env = "REWARDS_REWARD_TOKEN")]
    pub reward_token: Option<String>,

    /// Reward token decimals (env: REWARDS_REWARD_TOKEN_DECIMALS)
    #[arg(long, env = "REWARDS_REWARD_TOKEN_DECIMALS")]
    pub reward_token_decimals: Option<u32>,

    /// Output format (json, table)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Table format (human-readable)
    #[default]
    Table,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a ledger fixture, price deposits and build a rewards window
    RunWindow(window::RunWindowArgs),

    /// Verify published artifacts
    #[command(subcommand)]
    Verify(verify::VerifyCommands),

    /// Fee decomposition arithmetic
    #[command(subcommand)]
    Fee(fee::FeeCommands),

    /// Show referral tier and multiplier schedule versions and check their digests
    Schedules,

    /// Show the effective executor configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["rewards", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_run_window() {
        let cli = Cli::try_parse_from([
            "rewards",
            "--format",
            "json",
            "run-window",
            "--fixture",
            "ledger.json",
            "--window-index",
            "3",
            "--max-deposit-date",
            "2022-10-01T00:00:00Z",
            "--rewards-type",
            "referral",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::RunWindow(args) = cli.command else {
            panic!("expected run-window");
        };
        assert_eq!(args.window_index, 3);
        assert!(args.out.is_none());
    }

    #[test]
    fn test_schedules_is_the_only_schedule_entry_point() {
        let cli = Cli::try_parse_from(["rewards", "schedules"]).unwrap();
        assert!(matches!(cli.command, Commands::Schedules));
        assert!(Cli::try_parse_from(["rewards", "verify", "schedules"]).is_err());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }
}
