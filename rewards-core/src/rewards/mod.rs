//! Reward Computation
//!
//! Per deposit:
//! - `Referral`: LP fee USD x referral rate x multiplier, paid to the sticky referral
//! - `LpFee`: LP fee USD x multiplier, paid to the depositor
//! - `BridgeFee`: bridge fee USD x multiplier, paid to the depositor
//!
//! USD rewards are converted to raw reward-token units per deposit
//! (truncated), then summed per recipient.

use crate::eligibility::{reward_recipient, PricedDeposit};
use crate::error::{RewardsError, RewardsResult};
use crate::fee::{from_decimal, to_plain_string, to_raw_units};
use crate::multiplier::MultiplierSchedule;
use crate::referral::{ReferralVolumeIndex, TierSchedule};
use crate::types::{Address, Deposit, DepositKey, RewardsType};
use bigdecimal::{BigDecimal, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Inputs shared by every deposit of one window
pub struct RewardContext<'a> {
    pub rewards_type: RewardsType,
    pub tiers: &'a TierSchedule,
    pub multipliers: &'a MultiplierSchedule,
    pub volumes: &'a ReferralVolumeIndex,
    pub reward_token_decimals: u32,
}

/// Reward earned by one deposit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReward {
    pub deposit: DepositKey,
    pub recipient: Address,
    pub reward_usd: BigDecimal,
    /// Raw reward-token units
    pub reward_units: BigDecimal,
    /// Schedule versions applied, tier first when there is one
    pub schedule_versions: Vec<String>,
}

impl<'a> RewardContext<'a> {
    pub fn compute(&self, deposit: &Deposit, priced: &PricedDeposit) -> RewardsResult<DepositReward> {
        let recipient = reward_recipient(deposit, self.rewards_type)
            .cloned()
            .ok_or_else(|| {
                RewardsError::invariant(
                    "reward has a recipient",
                    format!("deposit {} has no {} recipient", priced.key, self.rewards_type),
                )
            })?;

        let (multiplier, multiplier_version) = self.multipliers.multiplier_at(priced.deposit_date)?;
        let multiplier = from_decimal(&multiplier);
        let (reward_usd, schedule_versions) = match self.rewards_type {
            RewardsType::Referral => {
                let snapshot = self.volumes.snapshot_at(&recipient, priced.deposit_date);
                let (rate, tier_version) = self.tiers.rate_at(priced.deposit_date, &snapshot)?;
                (
                    &priced.lp_fee_usd * from_decimal(&rate) * &multiplier,
                    vec![tier_version.to_string(), multiplier_version.to_string()],
                )
            }
            RewardsType::LpFee => (
                &priced.lp_fee_usd * &multiplier,
                vec![multiplier_version.to_string()],
            ),
            RewardsType::BridgeFee => (
                &priced.bridge_fee_usd * &multiplier,
                vec![multiplier_version.to_string()],
            ),
        };

        if !priced.reward_token_usd_price.is_positive() {
            return Err(RewardsError::MissingPrice {
                deposit: priced.key.to_string(),
                what: "reward token".to_string(),
            });
        }
        let reward_units = to_raw_units(
            &(&reward_usd / &priced.reward_token_usd_price),
            self.reward_token_decimals,
        );

        Ok(DepositReward {
            deposit: priced.key,
            recipient,
            reward_usd,
            reward_units,
            schedule_versions,
        })
    }
}

// ============================================================
// Aggregation
// ============================================================

/// Breakdown stored as the recipient payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientBreakdown {
    pub rewards_type: RewardsType,
    pub deposit_count: usize,
    pub total_reward_usd: String,
    pub schedule_versions: BTreeSet<String>,
}

/// Aggregated reward of one recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientTotal {
    pub address: Address,
    pub amount: BigDecimal,
    pub reward_usd: BigDecimal,
    pub deposits: Vec<DepositKey>,
    pub schedule_versions: BTreeSet<String>,
}

impl RecipientTotal {
    pub fn breakdown(&self, rewards_type: RewardsType) -> RecipientBreakdown {
        RecipientBreakdown {
            rewards_type,
            deposit_count: self.deposits.len(),
            total_reward_usd: to_plain_string(&self.reward_usd),
            schedule_versions: self.schedule_versions.clone(),
        }
    }
}

/// Sums deposit rewards per recipient
#[derive(Debug, Default)]
pub struct RecipientAggregator {
    totals: BTreeMap<Address, RecipientTotal>,
}

impl RecipientAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reward: DepositReward) {
        let total = self
            .totals
            .entry(reward.recipient.clone())
            .or_insert_with(|| RecipientTotal {
                address: reward.recipient.clone(),
                amount: BigDecimal::zero(),
                reward_usd: BigDecimal::zero(),
                deposits: Vec::new(),
                schedule_versions: BTreeSet::new(),
            });
        total.amount += &reward.reward_units;
        total.reward_usd += &reward.reward_usd;
        total.deposits.push(reward.deposit);
        total.schedule_versions.extend(reward.schedule_versions);
    }

    /// Totals ordered by address. Zero totals are dropped; a negative total
    /// is a data-integrity error.
    pub fn finish(self) -> RewardsResult<Vec<RecipientTotal>> {
        let mut out = Vec::with_capacity(self.totals.len());
        for (address, total) in self.totals {
            if total.amount.is_negative() {
                return Err(RewardsError::NegativeAggregate {
                    address: address.to_string(),
                    amount: total.amount.to_string(),
                });
            }
            if !total.amount.is_zero() {
                out.push(total);
            }
        }
        Ok(out)
    }
}
