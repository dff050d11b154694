//! Rewards CLI - Command Line Interface
//!
//! Operator tooling for the bridge rewards pipeline.
//!
//! # Usage
//!
//! ```text
//! rewards [OPTIONS] <COMMAND>
//!
//! Commands:
//!   run-window  Ingest a ledger fixture, price deposits and build a window
//!   verify      Verify published recipient proofs against a window root
//!   fee         Fee decomposition arithmetic
//!   schedules   Show and digest-check tier and multiplier schedule versions
//!   config      Show the effective executor configuration
//!
//! Options:
//!       --chain-id <ID>            Distributor chain [env: REWARDS_CHAIN_ID]
//!       --contract <ADDRESS>       Distributor contract [env: REWARDS_CONTRACT_ADDRESS]
//!       --reward-token <ADDRESS>   Reward token [env: REWARDS_REWARD_TOKEN]
//!   -f, --format <FORMAT>          Output format (json, table) [default: table]
//!   -v, --verbose                  Enable logging
//! ```
//!
//! # Examples
//!
//! ## Build a referral window
//! ```text
//! rewards run-window \
//!   --fixture ledger.json \
//!   --window-index 3 \
//!   --max-deposit-date 2022-10-01T00:00:00Z \
//!   --rewards-type referral \
//!   --out ./window-3
//! ```
//!
//! ## Verify published proofs
//! ```text
//! rewards verify proofs --window window-3/window.json --recipients window-3/recipients.json
//! ```
//!
//! ## Fee decomposition
//! ```text
//! rewards fee pct --wei-pct 500000000000000000 --amount 1000000000000000000 --usd-price 2000
//! ```

pub mod commands;
pub mod error;
pub mod fixture;
pub mod handler;
pub mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use error::{CliError, CliResult};
pub use fixture::LedgerFixture;

/// Rewards CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
