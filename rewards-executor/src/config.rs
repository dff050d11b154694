//! Executor configuration

use crate::error::{ExecutorError, ExecutorResult};
use bigdecimal::BigDecimal;
use rewards_core::fee::parse_integer;
use rewards_core::{Address, ChainId, DistributionLine};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default LP fee cap: 100% as a wei-percentage
pub const DEFAULT_LP_FEE_CAP: &str = "1000000000000000000";

/// Distribution line, reward token and job limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Chain the Merkle distributor lives on
    pub chain_id: ChainId,
    /// Merkle distributor contract
    pub contract_address: Address,
    /// Token paid out by every window
    pub reward_token: Address,
    pub reward_token_decimals: u32,
    /// Upper clamp for realized LP fee pct (wei-pct)
    pub lp_fee_cap: String,
    /// Job execution timeout in seconds
    pub job_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            chain_id: 10,
            contract_address: Address::zero(),
            reward_token: Address::zero(),
            reward_token_decimals: 18,
            lp_fee_cap: DEFAULT_LP_FEE_CAP.to_string(),
            job_timeout_secs: 600,
        }
    }
}

impl ExecutorConfig {
    /// Load from `REWARDS_*` environment variables, falling back to defaults.
    /// A variable that is set but malformed is a configuration error.
    pub fn from_env() -> ExecutorResult<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load from any variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> ExecutorResult<Self> {
        let defaults = Self::default();

        let address = |name: &str, default: Address| -> ExecutorResult<Address> {
            match var(name) {
                Some(value) => Address::parse(&value)
                    .map_err(|e| ExecutorError::configuration(format!("{name}: {e}"))),
                None => Ok(default),
            }
        };

        let config = Self {
            chain_id: parse_var("REWARDS_CHAIN_ID", var("REWARDS_CHAIN_ID"), defaults.chain_id)?,
            contract_address: address("REWARDS_CONTRACT_ADDRESS", defaults.contract_address)?,
            reward_token: address("REWARDS_REWARD_TOKEN", defaults.reward_token)?,
            reward_token_decimals: parse_var(
                "REWARDS_REWARD_TOKEN_DECIMALS",
                var("REWARDS_REWARD_TOKEN_DECIMALS"),
                defaults.reward_token_decimals,
            )?,
            lp_fee_cap: var("REWARDS_LP_FEE_CAP").unwrap_or(defaults.lp_fee_cap),
            job_timeout_secs: parse_var(
                "REWARDS_JOB_TIMEOUT_SECS",
                var("REWARDS_JOB_TIMEOUT_SECS"),
                defaults.job_timeout_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ExecutorResult<()> {
        self.lp_fee_cap()?;
        if self.job_timeout_secs == 0 {
            return Err(ExecutorError::configuration("job timeout must be positive"));
        }
        Ok(())
    }

    /// Parsed LP fee cap
    pub fn lp_fee_cap(&self) -> ExecutorResult<BigDecimal> {
        parse_integer("lpFeeCap", &self.lp_fee_cap)
            .map_err(|e| ExecutorError::configuration(e.to_string()))
    }

    pub fn line(&self) -> DistributionLine {
        DistributionLine::new(self.chain_id, self.contract_address.clone())
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    // Builder helpers

    pub fn with_line(mut self, chain_id: ChainId, contract_address: Address) -> Self {
        self.chain_id = chain_id;
        self.contract_address = contract_address;
        self
    }

    pub fn with_reward_token(mut self, token: Address, decimals: u32) -> Self {
        self.reward_token = token;
        self.reward_token_decimals = decimals;
        self
    }

    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }
}

fn parse_var<T>(name: &str, value: Option<String>, default: T) -> ExecutorResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ExecutorError::configuration(format!("{name}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
