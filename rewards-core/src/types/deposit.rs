//! Deposit ledger model
//!
//! Hard constraints:
//! - (origin_chain_id, deposit_id) is globally unique
//! - status only moves pending -> filled
//! - the sticky referral address is immutable once set
//! - a reward window index is set at most once per rewards type, and only
//!   after the deposit is filled

use super::common::*;
use super::job::RewardsType;
use crate::error::{RewardsError, RewardsResult};
use crate::fee::{cap_wei_pct, parse_integer, to_plain_string};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deposit status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Filled,
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositStatus::Pending => write!(f, "pending"),
            DepositStatus::Filled => write!(f, "filled"),
        }
    }
}

/// USD prices captured for a deposit's calendar day
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub token_symbol: String,
    pub decimals: u32,
    /// USD price of the bridged token
    pub token_usd_price: String,
    /// USD price of the reward token
    pub reward_token_usd_price: String,
    pub price_date: NaiveDate,
}

/// Fee percentages recorded at fill time (wei-percentages)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub realized_lp_fee_pct_raw: String,
    /// Raw value clamped into `[0, lpFeeCap]`
    pub realized_lp_fee_pct: String,
    pub relayer_fee_pct: String,
    /// Capped LP fee + relayer fee
    pub bridge_fee_pct: String,
}

/// Fill observed on the destination chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRecord {
    pub deposit: DepositKey,
    pub relayer: Address,
    pub realized_lp_fee_pct: String,
    pub relayer_fee_pct: String,
    /// Cumulative filled amount after this fill
    pub total_filled_amount: String,
    pub fill_tx: String,
    pub fill_date: DateTime<Utc>,
}

/// Result of applying a fill
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// Deposit still partially filled
    Partial,
    /// Deposit moved pending -> filled
    Filled,
    /// Deposit was already filled, fill absorbed
    AlreadyFilled,
}

/// One bridge transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub origin_chain_id: ChainId,
    pub destination_chain_id: ChainId,
    pub deposit_id: u64,
    pub depositor: Address,
    pub recipient: Address,
    pub input_token: Address,
    /// Fixed-point integer string
    pub input_amount: String,
    pub output_token: Option<Address>,
    pub output_amount: Option<String>,
    pub status: DepositStatus,
    pub deposit_date: DateTime<Utc>,
    pub deposit_tx: String,
    pub fill_date: Option<DateTime<Utc>>,
    pub fill_tx: Option<String>,
    pub filled_amount: String,
    /// Relayer fee quoted at deposit time, updated by speed-ups while pending
    pub relayer_fee_pct: String,
    pub fees: Option<FeeBreakdown>,
    pub price: Option<PriceSnapshot>,
    /// First-touch referral attribution
    pub sticky_referral_address: Option<Address>,
    /// Window each rewards type assigned this deposit to
    #[serde(default)]
    pub reward_windows: BTreeMap<RewardsType, WindowIndex>,
}

impl Deposit {
    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.origin_chain_id, self.deposit_id)
    }

    pub fn is_filled(&self) -> bool {
        self.status == DepositStatus::Filled
    }

    /// Window assigned for a rewards type
    pub fn window_for(&self, rewards_type: RewardsType) -> Option<WindowIndex> {
        self.reward_windows.get(&rewards_type).copied()
    }

    /// Set the sticky referral address; a different address cannot replace it
    pub fn set_sticky_referral(&mut self, referral: Address) -> RewardsResult<()> {
        match &self.sticky_referral_address {
            Some(current) if *current != referral => Err(RewardsError::StickyReferralImmutable {
                depositor: self.depositor.to_string(),
                current: current.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.sticky_referral_address = Some(referral);
                Ok(())
            }
        }
    }

    /// Replace the relayer fee while the deposit is pending.
    ///
    /// Returns `false` when the deposit is already filled.
    pub fn apply_speed_up(&mut self, new_relayer_fee_pct: &str) -> RewardsResult<bool> {
        parse_integer("newRelayerFeePct", new_relayer_fee_pct)?;
        if self.is_filled() {
            return Ok(false);
        }
        self.relayer_fee_pct = new_relayer_fee_pct.to_string();
        Ok(true)
    }

    /// Apply a fill, decomposing fees and moving to filled once the
    /// cumulative filled amount covers the input amount.
    pub fn apply_fill(&mut self, fill: &FillRecord, lp_fee_cap: &bigdecimal::BigDecimal) -> RewardsResult<FillOutcome> {
        if self.is_filled() {
            return Ok(FillOutcome::AlreadyFilled);
        }

        let input_amount = parse_integer("inputAmount", &self.input_amount)?;
        let total_filled = parse_integer("totalFilledAmount", &fill.total_filled_amount)?;
        let lp_raw = parse_integer("realizedLpFeePct", &fill.realized_lp_fee_pct)?;
        let relayer = parse_integer("relayerFeePct", &fill.relayer_fee_pct)?;

        let lp_capped = cap_wei_pct(&lp_raw, lp_fee_cap);
        let bridge = &lp_capped + &relayer;

        self.fees = Some(FeeBreakdown {
            realized_lp_fee_pct_raw: to_plain_string(&lp_raw),
            realized_lp_fee_pct: to_plain_string(&lp_capped),
            relayer_fee_pct: to_plain_string(&relayer),
            bridge_fee_pct: to_plain_string(&bridge),
        });
        self.filled_amount = to_plain_string(&total_filled);

        if total_filled >= input_amount {
            self.status = DepositStatus::Filled;
            self.fill_date = Some(fill.fill_date);
            self.fill_tx = Some(fill.fill_tx.clone());
            Ok(FillOutcome::Filled)
        } else {
            Ok(FillOutcome::Partial)
        }
    }

    pub fn set_price(&mut self, price: PriceSnapshot) {
        self.price = Some(price);
    }

    /// Stamp the deposit with the window that paid it out
    pub fn assign_window(&mut self, rewards_type: RewardsType, window_index: WindowIndex) -> RewardsResult<()> {
        if !self.is_filled() {
            return Err(RewardsError::DepositNotFilled {
                deposit: self.key().to_string(),
            });
        }
        if let Some(existing) = self.window_for(rewards_type) {
            return Err(RewardsError::WindowAlreadyAssigned {
                deposit: self.key().to_string(),
                rewards_type: rewards_type.to_string(),
                window_index: existing,
            });
        }
        self.reward_windows.insert(rewards_type, window_index);
        Ok(())
    }
}
