//! Distribution Repositories
//!
//! Claims, windows, jobs and snapshot reads.

use crate::error::{StoreError, StoreResult};
use crate::snapshot::LedgerSnapshot;
use async_trait::async_trait;
use rewards_core::{
    Address, Claim, DepositKey, DistributionLine, JobId, JobStatus, MerkleDistributorRecipient,
    MerkleDistributorWindow, RewardsType, RewardsWindowJob, WindowIndex,
};

/// Claim repository trait
#[async_trait]
pub trait ClaimRepository: Send + Sync {
    /// Insert a claim. Returns `false` when (window_index, account_index)
    /// was already recorded.
    async fn insert_claim(&self, claim: Claim) -> StoreResult<bool>;

    /// Get a claim by (window_index, account_index)
    async fn get_claim(&self, window_index: WindowIndex, account_index: u64) -> StoreResult<Option<Claim>>;

    /// Claims made by an account, ordered by window index
    async fn claims_for_account(&self, account: &Address) -> StoreResult<Vec<Claim>>;

    /// Claims against one window, ordered by account index
    async fn claims_for_window(&self, window_index: WindowIndex) -> StoreResult<Vec<Claim>>;
}

/// Everything a window job writes, committed all-or-nothing
#[derive(Clone, Debug)]
pub struct WindowCommit {
    pub window: MerkleDistributorWindow,
    pub recipients: Vec<MerkleDistributorRecipient>,
    /// Deposits stamped with the window index
    pub deposits: Vec<DepositKey>,
    pub rewards_type: RewardsType,
}

/// Window repository trait
#[async_trait]
pub trait WindowRepository: Send + Sync {
    /// Check whether (chain, contract, index) already exists
    async fn window_exists(&self, line: &DistributionLine, window_index: WindowIndex) -> StoreResult<bool>;

    /// Get a window
    async fn get_window(
        &self,
        line: &DistributionLine,
        window_index: WindowIndex,
    ) -> StoreResult<Option<MerkleDistributorWindow>>;

    /// Get a window, error if not found
    async fn get_window_required(
        &self,
        line: &DistributionLine,
        window_index: WindowIndex,
    ) -> StoreResult<MerkleDistributorWindow> {
        self.get_window(line, window_index)
            .await?
            .ok_or_else(|| StoreError::not_found("MerkleDistributorWindow", format!("{line}#{window_index}")))
    }

    /// Windows of a distribution line, ordered by index
    async fn list_windows(&self, line: &DistributionLine) -> StoreResult<Vec<MerkleDistributorWindow>>;

    /// Recipients of a window, ordered by account index
    async fn window_recipients(
        &self,
        line: &DistributionLine,
        window_index: WindowIndex,
    ) -> StoreResult<Vec<MerkleDistributorRecipient>>;

    /// Persist a window, its recipients and the deposit stamps atomically.
    ///
    /// Fails without writing anything when the window triple exists, a
    /// recipient address repeats, or any deposit is missing, unfilled or
    /// already assigned for the rewards type.
    async fn commit_window(&self, commit: WindowCommit) -> StoreResult<()>;
}

/// Rewards window job repository trait
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a job
    async fn create_job(&self, job: RewardsWindowJob) -> StoreResult<()>;

    /// Get job by ID
    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<RewardsWindowJob>>;

    /// Get job by ID, error if not found
    async fn get_job_required(&self, job_id: &JobId) -> StoreResult<RewardsWindowJob> {
        self.get_job(job_id)
            .await?
            .ok_or_else(|| StoreError::not_found("RewardsWindowJob", job_id.as_str()))
    }

    /// Replace a job row
    async fn update_job(&self, job: RewardsWindowJob) -> StoreResult<()>;

    /// List jobs by status, oldest first
    async fn list_jobs_by_status(&self, status: JobStatus, limit: usize) -> StoreResult<Vec<RewardsWindowJob>>;
}

/// Consistent point-in-time reads
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Deposits and claims read under a single lock
    async fn snapshot(&self) -> StoreResult<LedgerSnapshot>;
}
