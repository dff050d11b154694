//! Time-bucketed reward multipliers
//!
//! The multiplier is keyed on the deposit's calendar date (UTC) against an
//! ordered list of cutover dates.

use crate::error::{RewardsError, RewardsResult};
use crate::schedule::{genesis, ScheduleVersion, VersionedSchedule};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A cutover: from `date` onwards `multiplier` applies
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierCutover {
    pub date: NaiveDate,
    pub multiplier: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierTable {
    /// Multiplier before the first cutover
    pub initial: Decimal,
    /// Strictly increasing dates
    pub cutovers: Vec<MultiplierCutover>,
}

impl MultiplierTable {
    /// Observed history: 3x, then 2x from 2022-09-01, then 1x from 2022-10-01
    pub fn v1() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        Self {
            initial: Decimal::from(3),
            cutovers: vec![
                MultiplierCutover {
                    date: date(2022, 9, 1),
                    multiplier: Decimal::from(2),
                },
                MultiplierCutover {
                    date: date(2022, 10, 1),
                    multiplier: Decimal::from(1),
                },
            ],
        }
    }

    pub fn validate(&self) -> RewardsResult<()> {
        let ordered = self.cutovers.windows(2).all(|w| w[0].date < w[1].date);
        let non_negative = self.initial >= Decimal::ZERO
            && self.cutovers.iter().all(|c| c.multiplier >= Decimal::ZERO);
        if !ordered || !non_negative {
            return Err(RewardsError::InvalidRateTable {
                reason: "multiplier cutovers must be strictly increasing and non-negative"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Multiplier for a calendar date
    pub fn multiplier_for(&self, date: NaiveDate) -> Decimal {
        self.cutovers
            .iter()
            .rev()
            .find(|c| c.date <= date)
            .map(|c| c.multiplier)
            .unwrap_or(self.initial)
    }
}

impl Default for MultiplierTable {
    fn default() -> Self {
        Self::v1()
    }
}

/// Versioned multiplier tables
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiplierSchedule {
    schedule: VersionedSchedule<MultiplierTable>,
}

impl MultiplierSchedule {
    pub fn new() -> Self {
        Self {
            schedule: VersionedSchedule::new(),
        }
    }

    /// Schedule holding only the `v1` table, effective from genesis
    pub fn with_default_v1() -> RewardsResult<Self> {
        let mut schedule = Self::new();
        schedule.register("multipliers_v1", genesis(), MultiplierTable::v1())?;
        Ok(schedule)
    }

    pub fn register(
        &mut self,
        version_id: impl Into<String>,
        effective_from: DateTime<Utc>,
        table: MultiplierTable,
    ) -> RewardsResult<()> {
        table.validate()?;
        self.schedule
            .append(ScheduleVersion::new(version_id, effective_from, table)?)
    }

    /// Multiplier for a deposit made at `deposit_date`, with the version id used
    pub fn multiplier_at(&self, deposit_date: DateTime<Utc>) -> RewardsResult<(Decimal, &str)> {
        let version = self.schedule.version_at(deposit_date)?;
        Ok((
            version.content.multiplier_for(deposit_date.date_naive()),
            version.version_id.as_str(),
        ))
    }

    pub fn versions(&self) -> &VersionedSchedule<MultiplierTable> {
        &self.schedule
    }
}
