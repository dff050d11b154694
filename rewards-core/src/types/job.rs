//! Rewards-Window Job
//!
//! Lifecycle: `Initial -> InProgress -> {Done, Failed}`.
//! A failed job is never resumed; the operator creates a new one.

use super::common::*;
use crate::error::{RewardsError, RewardsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reward program a window distributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewardsType {
    /// Referral reward on the LP fee, paid to the sticky referral address
    Referral,
    /// LP fee rebate to the depositor, time-bucketed multiplier
    LpFee,
    /// Bridge fee rebate to the depositor, time-bucketed multiplier
    BridgeFee,
}

impl RewardsType {
    pub fn name(&self) -> &'static str {
        match self {
            RewardsType::Referral => "referral",
            RewardsType::LpFee => "lp-fee",
            RewardsType::BridgeFee => "bridge-fee",
        }
    }

    pub fn all() -> [RewardsType; 3] {
        [RewardsType::Referral, RewardsType::LpFee, RewardsType::BridgeFee]
    }
}

impl std::fmt::Display for RewardsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RewardsType {
    type Err = RewardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "referral" | "referrals" | "referral-rewards" => Ok(RewardsType::Referral),
            "lp-fee" | "lp" | "op-rewards" => Ok(RewardsType::LpFee),
            "bridge-fee" | "bridge" => Ok(RewardsType::BridgeFee),
            other => Err(RewardsError::invalid_job_config(format!(
                "unknown rewards type {other:?}"
            ))),
        }
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Initial,
    InProgress,
    Done,
    Failed,
}

impl JobStatus {
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Initial, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Done)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Initial => write!(f, "Initial"),
            JobStatus::InProgress => write!(f, "InProgress"),
            JobStatus::Done => write!(f, "Done"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Job trigger payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfig {
    /// Inclusive upper bound on eligible deposit dates
    pub max_deposit_date: DateTime<Utc>,
    pub rewards_type: RewardsType,
}

impl JobConfig {
    pub fn new(max_deposit_date: DateTime<Utc>, rewards_type: RewardsType) -> Self {
        Self {
            max_deposit_date,
            rewards_type,
        }
    }

    /// Parse the JSON trigger payload
    pub fn from_json(payload: &str) -> RewardsResult<Self> {
        serde_json::from_str(payload)
            .map_err(|e| RewardsError::invalid_job_config(e.to_string()))
    }

    /// A cutoff in the future would admit deposits that are still settling
    pub fn validate(&self, now: DateTime<Utc>) -> RewardsResult<()> {
        if self.max_deposit_date > now {
            return Err(RewardsError::invalid_job_config(format!(
                "maxDepositDate {} is in the future",
                self.max_deposit_date.to_rfc3339()
            )));
        }
        Ok(())
    }
}

/// One distribution cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsWindowJob {
    pub job_id: JobId,
    /// Target window index
    pub window_index: WindowIndex,
    pub status: JobStatus,
    /// Configuration snapshot
    pub config: JobConfig,
    pub error: Option<String>,
    pub execution_time_secs: Option<f64>,
    pub merkle_root: Option<Bytes32>,
    pub recipient_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardsWindowJob {
    /// Create a job in `Initial`
    pub fn new(window_index: WindowIndex, config: JobConfig) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::generate(),
            window_index,
            status: JobStatus::Initial,
            config,
            error: None,
            execution_time_secs: None,
            merkle_root: None,
            recipient_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: JobStatus) -> RewardsResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(RewardsError::InvalidJobTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Initial -> InProgress
    pub fn start(&mut self) -> RewardsResult<()> {
        self.transition(JobStatus::InProgress)
    }

    /// InProgress -> Done
    pub fn complete(
        &mut self,
        merkle_root: Bytes32,
        recipient_count: usize,
        execution_time_secs: f64,
    ) -> RewardsResult<()> {
        self.transition(JobStatus::Done)?;
        self.merkle_root = Some(merkle_root);
        self.recipient_count = recipient_count;
        self.execution_time_secs = Some(execution_time_secs);
        Ok(())
    }

    /// InProgress -> Failed
    pub fn fail(&mut self, error: impl Into<String>, execution_time_secs: f64) -> RewardsResult<()> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.execution_time_secs = Some(execution_time_secs);
        Ok(())
    }

    pub fn report(&self) -> JobReport {
        JobReport {
            job_id: self.job_id.clone(),
            window_index: self.window_index,
            rewards_type: self.config.rewards_type,
            status: self.status,
            error: self.error.clone(),
            execution_time_seconds: self.execution_time_secs,
            merkle_root: self.merkle_root,
            recipient_count: self.recipient_count,
        }
    }
}

/// Job status report handed back to callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: JobId,
    pub window_index: WindowIndex,
    pub rewards_type: RewardsType,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<Bytes32>,
    pub recipient_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config() -> JobConfig {
        JobConfig::new(Utc::now() - Duration::days(1), RewardsType::Referral)
    }

    #[test]
    fn test_job_happy_path() {
        let mut job = RewardsWindowJob::new(4, config());
        assert_eq!(job.status, JobStatus::Initial);

        job.start().unwrap();
        assert_eq!(job.status, JobStatus::InProgress);

        job.complete(Bytes32::keccak256(b"root"), 3, 0.25).unwrap();
        let report = job.report();
        assert_eq!(report.status, JobStatus::Done);
        assert_eq!(report.recipient_count, 3);
        assert_eq!(report.execution_time_seconds, Some(0.25));
    }

    #[test]
    fn test_failed_job_cannot_resume() {
        let mut job = RewardsWindowJob::new(4, config());
        job.start().unwrap();
        job.fail("boom", 0.1).unwrap();

        assert!(job.start().is_err());
        assert!(job.complete(Bytes32::zero(), 0, 0.0).is_err());
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_cannot_skip_in_progress() {
        let mut job = RewardsWindowJob::new(1, config());
        assert!(matches!(
            job.complete(Bytes32::zero(), 0, 0.0),
            Err(RewardsError::InvalidJobTransition { .. })
        ));
    }

    #[test]
    fn test_config_rejects_future_cutoff() {
        let now = Utc::now();
        let cfg = JobConfig::new(now + Duration::hours(1), RewardsType::LpFee);
        assert!(cfg.validate(now).is_err());
        assert!(config().validate(now).is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let cfg = JobConfig::from_json(
            r#"{"maxDepositDate":"2022-10-01T00:00:00Z","rewardsType":"referral"}"#,
        )
        .unwrap();
        assert_eq!(cfg.rewards_type, RewardsType::Referral);

        assert!(JobConfig::from_json(r#"{"rewardsType":"referral"}"#).is_err());
        assert!(JobConfig::from_json(r#"{"maxDepositDate":"not a date","rewardsType":"referral"}"#).is_err());
    }

    #[test]
    fn test_rewards_type_parse() {
        assert_eq!("referral".parse::<RewardsType>().unwrap(), RewardsType::Referral);
        assert_eq!("LP-FEE".parse::<RewardsType>().unwrap(), RewardsType::LpFee);
        assert!("nope".parse::<RewardsType>().is_err());
    }
}
