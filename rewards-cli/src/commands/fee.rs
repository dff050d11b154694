//! Fee Commands

use clap::Subcommand;

/// Fee subcommands
#[derive(Subcommand, Debug)]
pub enum FeeCommands {
    /// Decompose a wei-percentage applied to a token amount
    Pct {
        /// Percentage scaled by 10^18
        #[arg(long)]
        wei_pct: String,

        /// Token amount in raw units
        #[arg(long)]
        amount: String,

        /// USD price of one token
        #[arg(long)]
        usd_price: String,

        /// Token decimals
        #[arg(long, default_value_t = 18)]
        decimals: u32,
    },

    /// Split a USD relayer fee into gas and capital components
    Split {
        #[arg(long)]
        gas_fee_usd: String,

        #[arg(long)]
        relayer_fee_usd: String,

        #[arg(long)]
        relayer_fee_pct: String,
    },
}
