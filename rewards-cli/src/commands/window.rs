//! Window Commands

use crate::error::{CliError, CliResult};
use chrono::{DateTime, Utc};
use clap::Args;
use rewards_core::{JobConfig, RewardsType};
use std::path::PathBuf;

/// Arguments of `run-window`
#[derive(Args, Debug)]
pub struct RunWindowArgs {
    /// Ledger fixture (tokens, prices and events as JSON)
    #[arg(long, env = "REWARDS_FIXTURE")]
    pub fixture: PathBuf,

    /// Target window index
    #[arg(long)]
    pub window_index: u64,

    /// Inclusive cutoff on deposit dates (RFC 3339)
    #[arg(long)]
    pub max_deposit_date: String,

    /// Rewards type (referral, lp-fee, bridge-fee)
    #[arg(long, default_value = "referral")]
    pub rewards_type: String,

    /// Directory to write window.json and recipients.json into
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl RunWindowArgs {
    /// The job trigger these arguments describe
    pub fn job_config(&self) -> CliResult<JobConfig> {
        let cutoff = DateTime::parse_from_rfc3339(&self.max_deposit_date)
            .map_err(|e| CliError::invalid_arg(format!("--max-deposit-date: {e}")))?
            .with_timezone(&Utc);
        let rewards_type: RewardsType = self
            .rewards_type
            .parse()
            .map_err(|e: rewards_core::RewardsError| CliError::invalid_arg(e.to_string()))?;
        Ok(JobConfig::new(cutoff, rewards_type))
    }
}
