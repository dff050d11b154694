//! Fixed-Point Fee Arithmetic
//!
//! On-chain values arrive as integers scaled by a power of ten:
//! - wei-percentages are scaled by 10^18 (`500000000000000000` = 50%)
//! - token amounts are scaled by the token's own decimals
//!
//! All arithmetic is arbitrary precision (`BigDecimal`). Amount results that
//! must be integral are truncated toward zero, matching on-chain integer
//! division.

use crate::error::{RewardsError, RewardsResult};
use bigdecimal::{BigDecimal, Zero};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Scale of a wei-percentage
pub const WEI_PCT_DECIMALS: u32 = 18;

/// 10^exp as an exact decimal
pub fn pow10(exp: u32) -> BigDecimal {
    BigDecimal::new(BigInt::from(1), -i64::from(exp))
}

/// 10^-exp as an exact decimal
pub fn pow10_neg(exp: u32) -> BigDecimal {
    BigDecimal::new(BigInt::from(1), i64::from(exp))
}

/// Parse any decimal string (prices, percentages)
pub fn parse_decimal(field: &str, value: &str) -> RewardsResult<BigDecimal> {
    BigDecimal::from_str(value.trim())
        .map_err(|_| RewardsError::invalid_fixed_point(field, value))
}

/// Parse a fixed-point integer string (token amounts, wei-percentages)
pub fn parse_integer(field: &str, value: &str) -> RewardsResult<BigDecimal> {
    let parsed = parse_decimal(field, value)?;
    if !parsed.is_integer() {
        return Err(RewardsError::NonIntegerAmount {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(parsed.with_scale(0))
}

/// Drop the fractional part, rounding toward zero
pub fn truncate(value: &BigDecimal) -> BigDecimal {
    value.with_scale(0)
}

/// Exact conversion of a configuration decimal
pub fn from_decimal(value: &Decimal) -> BigDecimal {
    BigDecimal::new(BigInt::from(value.mantissa()), i64::from(value.scale()))
}

/// Render without exponent and without trailing zeros
pub fn to_plain_string(value: &BigDecimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    value.normalized().to_plain_string()
}

/// Convert a raw token amount to decimal units
pub fn to_decimal_units(amount: &BigDecimal, decimals: u32) -> BigDecimal {
    amount * pow10_neg(decimals)
}

/// Convert decimal units back to a raw integer amount (truncated)
pub fn to_raw_units(units: &BigDecimal, decimals: u32) -> BigDecimal {
    truncate(&(units * pow10(decimals)))
}

/// Plain percentage of a wei-percentage (`weiPct / 10^18`)
pub fn wei_pct_to_pct(wei_pct: &BigDecimal) -> BigDecimal {
    wei_pct * pow10_neg(WEI_PCT_DECIMALS)
}

/// Clamp a wei-percentage into `[0, cap]`
pub fn cap_wei_pct(raw: &BigDecimal, cap: &BigDecimal) -> BigDecimal {
    if *raw < BigDecimal::zero() {
        BigDecimal::zero()
    } else if raw > cap {
        cap.clone()
    } else {
        raw.clone()
    }
}

// ============================================================
// Percentage decomposition
// ============================================================

/// Everything derivable from a wei-percentage applied to a token amount
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PctValues {
    /// `weiPct / 10^18`
    pub pct: BigDecimal,
    /// `pct * 100`
    pub formatted_pct: BigDecimal,
    /// `amount * weiPct / 10^18`, truncated toward zero
    pub pct_amount: BigDecimal,
    /// `pct_amount` in decimal token units
    pub formatted_pct_amount: BigDecimal,
    /// `formatted_pct_amount * usdPrice`
    pub pct_amount_usd: BigDecimal,
}

impl PctValues {
    /// Compute from already-parsed values
    pub fn compute(
        wei_pct: &BigDecimal,
        total_amount: &BigDecimal,
        usd_price: &BigDecimal,
        decimals: u32,
    ) -> Self {
        let pct = wei_pct_to_pct(wei_pct);
        let formatted_pct = &pct * BigDecimal::from(100);
        let pct_amount = truncate(&(total_amount * wei_pct * pow10_neg(WEI_PCT_DECIMALS)));
        let formatted_pct_amount = to_decimal_units(&pct_amount, decimals);
        let pct_amount_usd = &formatted_pct_amount * usd_price;

        Self {
            pct,
            formatted_pct,
            pct_amount,
            formatted_pct_amount,
            pct_amount_usd,
        }
    }

    /// String rendering for reports
    pub fn formatted(&self) -> FormattedPctValues {
        FormattedPctValues {
            pct: to_plain_string(&self.pct),
            formatted_pct: to_plain_string(&self.formatted_pct),
            pct_amount: to_plain_string(&self.pct_amount),
            formatted_pct_amount: to_plain_string(&self.formatted_pct_amount),
            pct_amount_usd: to_plain_string(&self.pct_amount_usd),
        }
    }
}

/// [`PctValues`] rendered as plain decimal strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPctValues {
    pub pct: String,
    pub formatted_pct: String,
    pub pct_amount: String,
    pub formatted_pct_amount: String,
    pub pct_amount_usd: String,
}

/// Parse inputs and compute [`PctValues`]
pub fn compute_pct_values(
    wei_pct: &str,
    total_amount: &str,
    usd_price: &str,
    decimals: u32,
) -> RewardsResult<PctValues> {
    let wei_pct = parse_integer("weiPct", wei_pct)?;
    let total_amount = parse_integer("totalAmount", total_amount)?;
    let usd_price = parse_decimal("usdPrice", usd_price)?;
    Ok(PctValues::compute(&wei_pct, &total_amount, &usd_price, decimals))
}

// ============================================================
// Relayer fee split
// ============================================================

/// Gas / capital decomposition of a relayer fee
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayerFeeSplit {
    pub gas_fee_pct: BigDecimal,
    pub capital_fee_usd: BigDecimal,
    pub capital_fee_pct: BigDecimal,
}

impl RelayerFeeSplit {
    /// Split a USD relayer fee into its gas and capital components.
    ///
    /// A zero relayer fee yields all-zero components.
    pub fn compute(
        gas_fee_usd: &BigDecimal,
        relayer_fee_usd: &BigDecimal,
        relayer_fee_pct: &BigDecimal,
    ) -> Self {
        if relayer_fee_usd.is_zero() {
            return Self {
                gas_fee_pct: BigDecimal::zero(),
                capital_fee_usd: BigDecimal::zero(),
                capital_fee_pct: BigDecimal::zero(),
            };
        }

        let gas_fee_pct = (gas_fee_usd / relayer_fee_usd) * relayer_fee_pct;
        let capital_fee_usd = relayer_fee_usd - gas_fee_usd;
        let capital_fee_pct = relayer_fee_pct - &gas_fee_pct;

        Self {
            gas_fee_pct,
            capital_fee_usd,
            capital_fee_pct,
        }
    }

    /// String rendering for reports
    pub fn formatted(&self) -> FormattedRelayerFeeSplit {
        FormattedRelayerFeeSplit {
            gas_fee_pct: to_plain_string(&self.gas_fee_pct),
            capital_fee_usd: to_plain_string(&self.capital_fee_usd),
            capital_fee_pct: to_plain_string(&self.capital_fee_pct),
        }
    }
}

/// [`RelayerFeeSplit`] rendered as plain decimal strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedRelayerFeeSplit {
    pub gas_fee_pct: String,
    pub capital_fee_usd: String,
    pub capital_fee_pct: String,
}

/// Parse inputs and compute [`RelayerFeeSplit`]
pub fn split_relayer_fee(
    gas_fee_usd: &str,
    relayer_fee_usd: &str,
    relayer_fee_pct: &str,
) -> RewardsResult<RelayerFeeSplit> {
    let gas_fee_usd = parse_decimal("gasFeeUsd", gas_fee_usd)?;
    let relayer_fee_usd = parse_decimal("relayerFeeUsd", relayer_fee_usd)?;
    let relayer_fee_pct = parse_decimal("relayerFeePct", relayer_fee_pct)?;
    Ok(RelayerFeeSplit::compute(
        &gas_fee_usd,
        &relayer_fee_usd,
        &relayer_fee_pct,
    ))
}
