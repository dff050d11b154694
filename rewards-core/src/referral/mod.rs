//! Referral Tier Engine
//!
//! The referral rate applied to a deposit depends on how the deposit's
//! sticky referral address has performed up to that deposit's date:
//! the number of distinct depositors it brought in and their cumulative USD
//! volume. Deposits whose referral window has already been claimed by the
//! referral address no longer count.

use crate::eligibility::{is_filled, not_paid_out, PricedDeposit};
use crate::error::{RewardsError, RewardsResult};
use crate::fee::from_decimal;
use crate::schedule::{genesis, ScheduleVersion, VersionedSchedule};
use crate::types::{Address, Deposit, WindowIndex};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

// ============================================================
// Tier table
// ============================================================

/// One step: reached when either threshold is met
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralTier {
    pub min_count: u64,
    /// USD
    pub min_volume: Decimal,
    pub rate: Decimal,
}

impl ReferralTier {
    pub fn new(min_count: u64, min_volume: Decimal, rate: Decimal) -> Self {
        Self {
            min_count,
            min_volume,
            rate,
        }
    }

    fn reached(&self, count: u64, volume: &BigDecimal) -> bool {
        count >= self.min_count || *volume >= from_decimal(&self.min_volume)
    }
}

/// Step function, tiers ordered highest first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierTable {
    pub tiers: Vec<ReferralTier>,
    pub default_rate: Decimal,
}

impl TierTable {
    pub fn v1() -> Self {
        Self {
            tiers: vec![
                ReferralTier::new(20, Decimal::from(500_000), Decimal::new(8, 1)),
                ReferralTier::new(10, Decimal::from(250_000), Decimal::new(7, 1)),
                ReferralTier::new(5, Decimal::from(100_000), Decimal::new(6, 1)),
                ReferralTier::new(3, Decimal::from(50_000), Decimal::new(5, 1)),
            ],
            default_rate: Decimal::new(4, 1),
        }
    }

    /// Thresholds and rates must not increase going down the table, and the
    /// default rate must not exceed the lowest tier. This keeps the rate
    /// monotonic in both count and volume.
    pub fn validate(&self) -> RewardsResult<()> {
        let invalid = |reason: String| Err(RewardsError::InvalidRateTable { reason });

        for pair in self.tiers.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if lower.min_count > upper.min_count || lower.min_volume > upper.min_volume {
                return invalid(format!(
                    "tier thresholds ({}, {}) exceed the tier above",
                    lower.min_count, lower.min_volume
                ));
            }
            if lower.rate > upper.rate {
                return invalid(format!("tier rate {} exceeds the tier above", lower.rate));
            }
        }
        if let Some(lowest) = self.tiers.last() {
            if self.default_rate > lowest.rate {
                return invalid(format!(
                    "default rate {} exceeds lowest tier rate {}",
                    self.default_rate, lowest.rate
                ));
            }
        }
        if self.default_rate < Decimal::ZERO {
            return invalid("default rate is negative".to_string());
        }
        Ok(())
    }

    /// First tier reached, evaluated highest first
    pub fn rate_for(&self, count: u64, volume: &BigDecimal) -> Decimal {
        self.tiers
            .iter()
            .find(|tier| tier.reached(count, volume))
            .map(|tier| tier.rate)
            .unwrap_or(self.default_rate)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::v1()
    }
}

/// Versioned tier tables
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierSchedule {
    schedule: VersionedSchedule<TierTable>,
}

impl TierSchedule {
    pub fn new() -> Self {
        Self {
            schedule: VersionedSchedule::new(),
        }
    }

    pub fn with_default_v1() -> RewardsResult<Self> {
        let mut schedule = Self::new();
        schedule.register("tiers_v1", genesis(), TierTable::v1())?;
        Ok(schedule)
    }

    pub fn register(
        &mut self,
        version_id: impl Into<String>,
        effective_from: DateTime<Utc>,
        table: TierTable,
    ) -> RewardsResult<()> {
        table.validate()?;
        self.schedule
            .append(ScheduleVersion::new(version_id, effective_from, table)?)
    }

    /// Rate for a referral snapshot taken at `deposit_date`, with the
    /// version id used
    pub fn rate_at(
        &self,
        deposit_date: DateTime<Utc>,
        snapshot: &ReferralVolumeSnapshot,
    ) -> RewardsResult<(Decimal, &str)> {
        let version = self.schedule.version_at(deposit_date)?;
        Ok((
            version
                .content
                .rate_for(snapshot.referral_count, &snapshot.referral_volume),
            version.version_id.as_str(),
        ))
    }

    pub fn versions(&self) -> &VersionedSchedule<TierTable> {
        &self.schedule
    }
}

// ============================================================
// Volume aggregation
// ============================================================

/// Referral performance as of one point in time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralVolumeSnapshot {
    pub referral_address: Address,
    /// Distinct depositors
    pub referral_count: u64,
    /// Cumulative USD volume
    pub referral_volume: BigDecimal,
}

#[derive(Clone, Debug)]
struct VolumePoint {
    at: DateTime<Utc>,
    count: u64,
    volume: BigDecimal,
}

/// Cumulative referral volume per referral address, built once per ledger
/// snapshot and queried per deposit date
#[derive(Clone, Debug, Default)]
pub struct ReferralVolumeIndex {
    points: HashMap<Address, Vec<VolumePoint>>,
}

impl ReferralVolumeIndex {
    /// Aggregate filled, priced, not-yet-paid-out deposits by sticky
    /// referral address. `claimed` maps an address to the windows it has
    /// claimed.
    pub fn build<'a>(
        deposits: impl IntoIterator<Item = &'a Deposit>,
        claimed: &HashMap<Address, BTreeSet<WindowIndex>>,
    ) -> RewardsResult<Self> {
        let empty = BTreeSet::new();
        let mut grouped: HashMap<Address, Vec<PricedDeposit>> = HashMap::new();

        for deposit in deposits {
            let Some(referral) = &deposit.sticky_referral_address else {
                continue;
            };
            let claimed_windows = claimed.get(referral).unwrap_or(&empty);
            if !is_filled(deposit) || !not_paid_out(deposit, claimed_windows) {
                continue;
            }
            if let Some(priced) = PricedDeposit::from_deposit(deposit)? {
                grouped.entry(referral.clone()).or_default().push(priced);
            }
        }

        let points = grouped
            .into_iter()
            .map(|(referral, mut deposits)| {
                deposits.sort_by(|a, b| a.deposit_date.cmp(&b.deposit_date).then(a.key.cmp(&b.key)));

                let mut depositors = HashSet::new();
                let mut volume = BigDecimal::zero();
                let series = deposits
                    .into_iter()
                    .map(|d| {
                        depositors.insert(d.depositor);
                        volume += &d.usd_volume;
                        VolumePoint {
                            at: d.deposit_date,
                            count: depositors.len() as u64,
                            volume: volume.clone(),
                        }
                    })
                    .collect();
                (referral, series)
            })
            .collect();

        Ok(Self { points })
    }

    /// Performance of `referral` counting deposits dated at or before `at`
    pub fn snapshot_at(&self, referral: &Address, at: DateTime<Utc>) -> ReferralVolumeSnapshot {
        let point = self.points.get(referral).and_then(|series| {
            let upto = series.partition_point(|p| p.at <= at);
            upto.checked_sub(1).map(|i| &series[i])
        });

        ReferralVolumeSnapshot {
            referral_address: referral.clone(),
            referral_count: point.map_or(0, |p| p.count),
            referral_volume: point.map_or_else(BigDecimal::zero, |p| p.volume.clone()),
        }
    }

    pub fn referral_count(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::parse_integer;
    use crate::types::deposit::fixtures::*;
    use crate::types::{PriceSnapshot, RewardsType};
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn usd(v: u64) -> BigDecimal {
        BigDecimal::from(v)
    }

    #[test]
    fn test_default_tiers() {
        let table = TierTable::v1();
        table.validate().unwrap();
        assert_eq!(table.rate_for(0, &usd(0)), Decimal::new(4, 1));
        assert_eq!(table.rate_for(3, &usd(0)), Decimal::new(5, 1));
        assert_eq!(table.rate_for(0, &usd(50_000)), Decimal::new(5, 1));
        assert_eq!(table.rate_for(4, &usd(100_000)), Decimal::new(6, 1));
        assert_eq!(table.rate_for(10, &usd(0)), Decimal::new(7, 1));
        assert_eq!(table.rate_for(1, &usd(500_000)), Decimal::new(8, 1));
        assert_eq!(table.rate_for(20, &usd(499_999)), Decimal::new(8, 1));
    }

    #[test]
    fn test_rejects_non_monotonic_table() {
        let mut table = TierTable::v1();
        table.tiers.swap(0, 1);
        assert!(table.validate().is_err());

        let mut table = TierTable::v1();
        table.default_rate = Decimal::new(9, 1);
        assert!(table.validate().is_err());
    }

    proptest! {
        #[test]
        fn rate_is_monotonic(
            count in 0u64..40,
            volume in 0u64..1_000_000,
            extra_count in 0u64..40,
            extra_volume in 0u64..1_000_000,
        ) {
            let table = TierTable::v1();
            let base = table.rate_for(count, &usd(volume));
            prop_assert!(table.rate_for(count + extra_count, &usd(volume)) >= base);
            prop_assert!(table.rate_for(count, &usd(volume + extra_volume)) >= base);
        }
    }

    fn cap() -> BigDecimal {
        parse_integer("cap", "1000000000000000000").unwrap()
    }

    /// Filled, priced deposit of 1 token at `token_usd`, referred by 0x77..
    fn referred(id: u64, depositor: u8, day_offset: i64, token_usd: &str) -> Deposit {
        let mut d = pending_deposit(id, depositor);
        d.deposit_date = d.deposit_date + Duration::days(day_offset);
        let fill = fill_for(&d, &d.input_amount.clone());
        d.apply_fill(&fill, &cap()).unwrap();
        d.set_price(PriceSnapshot {
            token_symbol: "WETH".to_string(),
            decimals: 18,
            token_usd_price: token_usd.to_string(),
            reward_token_usd_price: "1".to_string(),
            price_date: NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(),
        });
        d.set_sticky_referral(addr(0x77)).unwrap();
        d
    }

    #[test]
    fn test_volume_counts_distinct_depositors_up_to_date() {
        let deposits = vec![
            referred(1, 1, 0, "1000"),
            referred(2, 1, 1, "1000"),
            referred(3, 2, 2, "1000"),
            referred(4, 3, 5, "1000"),
        ];
        let index = ReferralVolumeIndex::build(&deposits, &HashMap::new()).unwrap();

        let s = index.snapshot_at(&addr(0x77), deposits[2].deposit_date);
        assert_eq!(s.referral_count, 2);
        assert_eq!(s.referral_volume, usd(3000));

        let s = index.snapshot_at(&addr(0x77), deposits[0].deposit_date - Duration::seconds(1));
        assert_eq!(s.referral_count, 0);

        let other = index.snapshot_at(&addr(0x55), deposits[3].deposit_date);
        assert_eq!(other.referral_volume, usd(0));
    }

    #[test]
    fn test_claimed_windows_are_excluded() {
        let mut paid = referred(1, 1, 0, "60000");
        paid.assign_window(RewardsType::Referral, 0).unwrap();
        let fresh = referred(2, 2, 1, "1000");
        let deposits = vec![paid, fresh];

        // Window 0 assigned but not yet claimed: still counted
        let index = ReferralVolumeIndex::build(&deposits, &HashMap::new()).unwrap();
        let s = index.snapshot_at(&addr(0x77), deposits[1].deposit_date);
        assert_eq!(s.referral_volume, usd(61_000));

        // Claimed: dropped from every later aggregate
        let claimed = HashMap::from([(addr(0x77), BTreeSet::from([0u64]))]);
        let index = ReferralVolumeIndex::build(&deposits, &claimed).unwrap();
        let s = index.snapshot_at(&addr(0x77), deposits[1].deposit_date);
        assert_eq!(s.referral_volume, usd(1000));
        assert_eq!(s.referral_count, 1);
    }

    #[test]
    fn test_schedule_rate_at() {
        let schedule = TierSchedule::with_default_v1().unwrap();
        let snapshot = ReferralVolumeSnapshot {
            referral_address: addr(1),
            referral_count: 5,
            referral_volume: usd(0),
        };
        let (rate, version) = schedule.rate_at(Utc::now(), &snapshot).unwrap();
        assert_eq!(rate, Decimal::new(6, 1));
        assert_eq!(version, "tiers_v1");
    }
}
