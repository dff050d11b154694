//! Deposit Eligibility
//!
//! A deposit's standing towards one rewards type is an explicit state:
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Unfilled` | still pending on the destination chain |
//! | `Unpriced` | filled, but no USD price snapshot yet |
//! | `Priced` | filled and priced, USD values resolved |
//! | `WindowAssigned` | already paid out by a window of this type |
//!
//! The filters used by aggregation are exposed as named predicates so they
//! can be tested without any storage.

use crate::error::{RewardsError, RewardsResult};
use crate::fee::{parse_decimal, parse_integer, to_decimal_units, PctValues};
use crate::types::{Address, Deposit, DepositKey, RewardsType, WindowIndex};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// USD-resolved view of a filled, priced deposit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricedDeposit {
    pub key: DepositKey,
    pub depositor: Address,
    pub referral: Option<Address>,
    pub deposit_date: DateTime<Utc>,
    /// `inputAmount / 10^decimals * tokenUsdPrice`
    pub usd_volume: BigDecimal,
    /// Capped LP fee applied to the input amount, in USD
    pub lp_fee_usd: BigDecimal,
    /// Bridge fee applied to the input amount, in USD
    pub bridge_fee_usd: BigDecimal,
    pub reward_token_usd_price: BigDecimal,
}

impl PricedDeposit {
    /// Resolve USD values; `None` when the deposit is not filled or has no price
    pub fn from_deposit(deposit: &Deposit) -> RewardsResult<Option<Self>> {
        let (Some(price), Some(fees)) = (&deposit.price, &deposit.fees) else {
            return Ok(None);
        };
        if !deposit.is_filled() {
            return Ok(None);
        }

        let amount = parse_integer("inputAmount", &deposit.input_amount)?;
        let token_price = parse_decimal("tokenUsdPrice", &price.token_usd_price)?;
        let reward_price = parse_decimal("rewardTokenUsdPrice", &price.reward_token_usd_price)?;
        let lp_pct = parse_integer("realizedLpFeePct", &fees.realized_lp_fee_pct)?;
        let bridge_pct = parse_integer("bridgeFeePct", &fees.bridge_fee_pct)?;

        let usd_volume = to_decimal_units(&amount, price.decimals) * &token_price;
        let lp = PctValues::compute(&lp_pct, &amount, &token_price, price.decimals);
        let bridge = PctValues::compute(&bridge_pct, &amount, &token_price, price.decimals);

        Ok(Some(Self {
            key: deposit.key(),
            depositor: deposit.depositor.clone(),
            referral: deposit.sticky_referral_address.clone(),
            deposit_date: deposit.deposit_date,
            usd_volume,
            lp_fee_usd: lp.pct_amount_usd,
            bridge_fee_usd: bridge.pct_amount_usd,
            reward_token_usd_price: reward_price,
        }))
    }
}

/// Standing of a deposit towards one rewards type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepositState {
    Unfilled,
    Unpriced,
    Priced(PricedDeposit),
    WindowAssigned(WindowIndex),
}

impl DepositState {
    pub fn classify(deposit: &Deposit, rewards_type: RewardsType) -> RewardsResult<Self> {
        if !deposit.is_filled() {
            return Ok(DepositState::Unfilled);
        }
        if let Some(index) = deposit.window_for(rewards_type) {
            return Ok(DepositState::WindowAssigned(index));
        }
        match PricedDeposit::from_deposit(deposit)? {
            Some(priced) => Ok(DepositState::Priced(priced)),
            None if deposit.fees.is_none() => Err(RewardsError::invariant(
                "filled deposit carries fees",
                format!("deposit {} is filled without a fee breakdown", deposit.key()),
            )),
            None => Ok(DepositState::Unpriced),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DepositState::Unfilled => "unfilled",
            DepositState::Unpriced => "unpriced",
            DepositState::Priced(_) => "priced",
            DepositState::WindowAssigned(_) => "window_assigned",
        }
    }
}

// ============================================================
// Named predicates
// ============================================================

pub fn is_filled(deposit: &Deposit) -> bool {
    deposit.is_filled()
}

pub fn is_priced(deposit: &Deposit) -> bool {
    deposit.price.is_some()
}

/// Inclusive date bound
pub fn deposited_on_or_before(deposit: &Deposit, cutoff: DateTime<Utc>) -> bool {
    deposit.deposit_date <= cutoff
}

pub fn shares_referral(deposit: &Deposit, referral: &Address) -> bool {
    deposit.sticky_referral_address.as_ref() == Some(referral)
}

/// A deposit is paid out once its referral window has been claimed by the
/// referral address.
pub fn not_paid_out(deposit: &Deposit, claimed_windows: &BTreeSet<WindowIndex>) -> bool {
    match deposit.window_for(RewardsType::Referral) {
        Some(index) => !claimed_windows.contains(&index),
        None => true,
    }
}

/// Recipient of a deposit's reward for a rewards type
pub fn reward_recipient(deposit: &Deposit, rewards_type: RewardsType) -> Option<&Address> {
    match rewards_type {
        RewardsType::Referral => deposit.sticky_referral_address.as_ref(),
        RewardsType::LpFee | RewardsType::BridgeFee => Some(&deposit.depositor),
    }
}

/// Candidate for a new window of `rewards_type` with the given cutoff
/// (price is checked separately so unpriced candidates can be reported).
pub fn is_window_candidate(deposit: &Deposit, rewards_type: RewardsType, cutoff: DateTime<Utc>) -> bool {
    is_filled(deposit)
        && deposited_on_or_before(deposit, cutoff)
        && deposit.window_for(rewards_type).is_none()
        && reward_recipient(deposit, rewards_type).is_some()
}

pub fn is_window_eligible(deposit: &Deposit, rewards_type: RewardsType, cutoff: DateTime<Utc>) -> bool {
    is_window_candidate(deposit, rewards_type, cutoff) && is_priced(deposit)
}
