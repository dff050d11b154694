//! Versioned Configuration Schedules
//!
//! Rate tables change over time but never retroactively: a new version is
//! appended with a later `effective_from`, and lookups select the version
//! in force at a deposit's date. Every version carries a BLAKE3 digest of
//! its canonical JSON content so a historical window can name the exact
//! table it was computed with.

use crate::error::{RewardsError, RewardsResult};
use crate::types::Bytes32;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Earliest representable effective date, used by the default versions
pub fn genesis() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(0, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// One immutable version of a configuration table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleVersion<T> {
    pub version_id: String,
    pub effective_from: DateTime<Utc>,
    pub content: T,
    pub digest: Bytes32,
}

impl<T: Serialize> ScheduleVersion<T> {
    /// Create a version, computing its digest
    pub fn new(
        version_id: impl Into<String>,
        effective_from: DateTime<Utc>,
        content: T,
    ) -> RewardsResult<Self> {
        let digest = compute_digest(&content)?;
        Ok(Self {
            version_id: version_id.into(),
            effective_from,
            content,
            digest,
        })
    }

    /// Check the stored digest against the content
    pub fn verify_digest(&self) -> RewardsResult<bool> {
        Ok(compute_digest(&self.content)? == self.digest)
    }
}

fn compute_digest<T: Serialize>(content: &T) -> RewardsResult<Bytes32> {
    let bytes = serde_json::to_vec(content)?;
    Ok(Bytes32::blake3(&bytes))
}

/// Append-only list of versions ordered by `effective_from`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionedSchedule<T> {
    versions: Vec<ScheduleVersion<T>>,
}

impl<T: Serialize> VersionedSchedule<T> {
    pub fn new() -> Self {
        Self {
            versions: Vec::new(),
        }
    }

    /// Append a version.
    ///
    /// Rejected when the digest does not match, the id is reused, or the
    /// effective date does not strictly follow the latest version.
    pub fn append(&mut self, version: ScheduleVersion<T>) -> RewardsResult<()> {
        if !version.verify_digest()? {
            return Err(RewardsError::ScheduleDigestMismatch {
                version_id: version.version_id,
            });
        }
        if self.versions.iter().any(|v| v.version_id == version.version_id) {
            return Err(RewardsError::ScheduleNotAppendOnly {
                version_id: version.version_id,
                reason: "version id already registered".to_string(),
            });
        }
        if let Some(latest) = self.versions.last() {
            if version.effective_from <= latest.effective_from {
                return Err(RewardsError::ScheduleNotAppendOnly {
                    version_id: version.version_id,
                    reason: format!(
                        "effective_from must be after {}",
                        latest.effective_from.to_rfc3339()
                    ),
                });
            }
        }
        self.versions.push(version);
        Ok(())
    }

    /// Version in force at `at`
    pub fn version_at(&self, at: DateTime<Utc>) -> RewardsResult<&ScheduleVersion<T>> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.effective_from <= at)
            .ok_or_else(|| RewardsError::NoEffectiveVersion {
                at: at.to_rfc3339(),
            })
    }

    pub fn get(&self, version_id: &str) -> Option<&ScheduleVersion<T>> {
        self.versions.iter().find(|v| v.version_id == version_id)
    }

    pub fn latest(&self) -> Option<&ScheduleVersion<T>> {
        self.versions.last()
    }

    pub fn versions(&self) -> &[ScheduleVersion<T>] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl<T: Serialize> Default for VersionedSchedule<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 9, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_selects_version_by_date() {
        let mut schedule = VersionedSchedule::new();
        schedule.append(ScheduleVersion::new("v1", at(1), 1u32).unwrap()).unwrap();
        schedule.append(ScheduleVersion::new("v2", at(10), 2u32).unwrap()).unwrap();

        assert_eq!(schedule.version_at(at(1)).unwrap().version_id, "v1");
        assert_eq!(schedule.version_at(at(9)).unwrap().content, 1);
        assert_eq!(schedule.version_at(at(10)).unwrap().content, 2);
        assert!(schedule.version_at(at(1) - Duration::seconds(1)).is_err());
    }

    #[test]
    fn test_rejects_out_of_order_and_reused_ids() {
        let mut schedule = VersionedSchedule::new();
        schedule.append(ScheduleVersion::new("v1", at(5), 1u32).unwrap()).unwrap();

        let earlier = ScheduleVersion::new("v2", at(5), 2u32).unwrap();
        assert!(matches!(
            schedule.append(earlier),
            Err(RewardsError::ScheduleNotAppendOnly { .. })
        ));

        let reused = ScheduleVersion::new("v1", at(6), 2u32).unwrap();
        assert!(schedule.append(reused).is_err());
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn test_rejects_tampered_content() {
        let mut version = ScheduleVersion::new("v1", at(1), 1u32).unwrap();
        version.content = 7;
        let mut schedule = VersionedSchedule::new();
        assert!(matches!(
            schedule.append(version),
            Err(RewardsError::ScheduleDigestMismatch { .. })
        ));
    }
}
