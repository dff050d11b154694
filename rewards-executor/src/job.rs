//! Rewards-Window Job Executor
//!
//! Drives one distribution cycle:
//!
//! ```text
//! create_job ──► Initial ──run_job──► InProgress ──┬──► Done
//!                                                  └──► Failed
//! ```
//!
//! Configuration errors (bad cutoff, window index collision, a job already
//! in flight) are returned before any transition. Once a job is in
//! progress, every failure is recorded on the job and nothing is written:
//! the window, its recipients and the deposit stamps go through a single
//! atomic commit.
//!
//! A job left `InProgress` by a crash or a lost final write blocks the
//! line until [`RewardsWindowExecutor::recover_job`] settles it: `Done`
//! with the committed root when its window exists, `Failed` otherwise.

use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, ExecutorResult};
use crate::pricing::PricingGap;
use chrono::Utc;
use rewards_core::eligibility::is_window_candidate;
use rewards_core::fee::to_plain_string;
use rewards_core::{
    build_window_tree, Bytes32, DepositState, JobConfig, JobId, JobReport, JobStatus,
    MerkleDistributorRecipient, MerkleDistributorWindow, MultiplierSchedule, RecipientAggregator,
    RecipientArtifact, RecipientTotal, ReferralVolumeIndex, RewardContext, RewardsError,
    RewardsWindowJob, TierSchedule, WindowArtifact, WindowIndex,
};
use rewards_store::{LedgerStore, WindowCommit};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What a successful build committed
#[derive(Clone, Debug)]
struct WindowBuild {
    root: Bytes32,
    recipient_count: usize,
    rewards_to_deposit: String,
    gaps: Vec<PricingGap>,
}

pub struct RewardsWindowExecutor<S: LedgerStore + ?Sized> {
    store: Arc<S>,
    config: ExecutorConfig,
    tiers: TierSchedule,
    multipliers: MultiplierSchedule,
}

impl<S: LedgerStore + ?Sized> RewardsWindowExecutor<S> {
    /// Create an executor with the default tier and multiplier tables
    pub fn new(store: Arc<S>, config: ExecutorConfig) -> ExecutorResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            tiers: TierSchedule::with_default_v1()?,
            multipliers: MultiplierSchedule::with_default_v1()?,
        })
    }

    pub fn with_tiers(mut self, tiers: TierSchedule) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_multipliers(mut self, multipliers: MultiplierSchedule) -> Self {
        self.multipliers = multipliers;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    // ============================================================
    // Job lifecycle
    // ============================================================

    /// Validate the trigger and persist a job in `Initial`
    pub async fn create_job(&self, window_index: WindowIndex, config: JobConfig) -> ExecutorResult<RewardsWindowJob> {
        config.validate(Utc::now())?;
        self.check_window_index(window_index).await?;

        let in_flight = self.store.list_jobs_by_status(JobStatus::InProgress, usize::MAX).await?;
        if let Some(other) = in_flight.iter().find(|j| j.window_index == window_index) {
            return Err(ExecutorError::configuration(format!(
                "job {} is already building window {window_index}",
                other.job_id
            )));
        }

        let job = RewardsWindowJob::new(window_index, config);
        self.store.create_job(job.clone()).await?;
        info!(
            job_id = %job.job_id,
            window_index,
            rewards_type = %job.config.rewards_type,
            "job created"
        );
        Ok(job)
    }

    /// Run an `Initial` job to a terminal state.
    ///
    /// Returns `Err` only for configuration errors and storage failures on
    /// the job row itself; build failures come back as a `Failed` report.
    pub async fn run_job(&self, job_id: &JobId) -> ExecutorResult<JobReport> {
        let mut job = self.store.get_job_required(job_id).await?;
        if job.status != JobStatus::Initial {
            return Err(ExecutorError::configuration(format!(
                "job {job_id} is {}, only Initial jobs can run",
                job.status
            )));
        }
        let in_flight = self.store.list_jobs_by_status(JobStatus::InProgress, usize::MAX).await?;
        if let Some(other) = in_flight.first() {
            return Err(ExecutorError::configuration(format!(
                "job {} is still in progress on {}",
                other.job_id,
                self.config.line()
            )));
        }
        self.check_window_index(job.window_index).await?;

        job.start()?;
        self.store.update_job(job.clone()).await?;
        info!(
            job_id = %job.job_id,
            window_index = job.window_index,
            rewards_type = %job.config.rewards_type,
            max_deposit_date = %job.config.max_deposit_date,
            "job started"
        );

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.config.job_timeout(), self.build_window(&job)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::JobTimeout {
                job_id: job.job_id.to_string(),
                timeout_secs: self.config.job_timeout_secs,
            }),
        };
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(build) => {
                job.complete(build.root, build.recipient_count, elapsed)?;
                info!(
                    job_id = %job.job_id,
                    window_index = job.window_index,
                    rewards_type = %job.config.rewards_type,
                    merkle_root = %build.root,
                    recipients = build.recipient_count,
                    rewards_to_deposit = %build.rewards_to_deposit,
                    gaps = build.gaps.len(),
                    elapsed_secs = elapsed,
                    "job done"
                );
            }
            Err(err) => {
                job.fail(err.to_string(), elapsed)?;
                error!(
                    job_id = %job.job_id,
                    window_index = job.window_index,
                    rewards_type = %job.config.rewards_type,
                    error = %err,
                    "job failed"
                );
            }
        }

        if let Err(err) = self.store.update_job(job.clone()).await {
            let Some(root) = job.merkle_root.filter(|_| job.status == JobStatus::Done) else {
                return Err(err.into());
            };
            // The window is already committed; the row stays InProgress
            // until recover_job settles it.
            error!(
                job_id = %job.job_id,
                window_index = job.window_index,
                merkle_root = %root,
                error = %err,
                "window committed but job row not updated"
            );
        }
        Ok(job.report())
    }

    /// Settle a job stuck in `InProgress`.
    ///
    /// If its window was committed the job is completed with the committed
    /// root and recipient count, otherwise it is failed with `reason`.
    pub async fn recover_job(&self, job_id: &JobId, reason: &str) -> ExecutorResult<JobReport> {
        let mut job = self.store.get_job_required(job_id).await?;
        if job.status != JobStatus::InProgress {
            return Err(ExecutorError::configuration(format!(
                "job {job_id} is {}, only InProgress jobs can be recovered",
                job.status
            )));
        }

        let line = self.config.line();
        let elapsed = (Utc::now() - job.updated_at).num_milliseconds().max(0) as f64 / 1000.0;
        match self.store.get_window(&line, job.window_index).await? {
            Some(window) if window.job_id == job.job_id => {
                let recipients = self.store.window_recipients(&line, job.window_index).await?;
                job.complete(window.merkle_root, recipients.len(), elapsed)?;
                warn!(
                    job_id = %job.job_id,
                    window_index = job.window_index,
                    merkle_root = %window.merkle_root,
                    "in-progress job recovered from its committed window"
                );
            }
            _ => {
                job.fail(reason, elapsed)?;
                warn!(
                    job_id = %job.job_id,
                    window_index = job.window_index,
                    reason,
                    "in-progress job failed by operator"
                );
            }
        }

        self.store.update_job(job.clone()).await?;
        Ok(job.report())
    }

    /// Create and run a job in one call
    pub async fn execute(&self, window_index: WindowIndex, config: JobConfig) -> ExecutorResult<JobReport> {
        let job = self.create_job(window_index, config).await?;
        self.run_job(&job.job_id).await
    }

    pub async fn job_report(&self, job_id: &JobId) -> ExecutorResult<JobReport> {
        Ok(self.store.get_job_required(job_id).await?.report())
    }

    pub async fn list_jobs(&self, status: JobStatus, limit: usize) -> ExecutorResult<Vec<JobReport>> {
        let jobs = self.store.list_jobs_by_status(status, limit).await?;
        Ok(jobs.iter().map(RewardsWindowJob::report).collect())
    }

    /// Published artifacts of a committed window
    pub async fn artifacts(&self, window_index: WindowIndex) -> ExecutorResult<(WindowArtifact, Vec<RecipientArtifact>)> {
        let line = self.config.line();
        let window = self.store.get_window_required(&line, window_index).await?;
        let recipients = self.store.window_recipients(&line, window_index).await?;
        Ok((
            window.artifact(),
            recipients.iter().map(MerkleDistributorRecipient::artifact).collect(),
        ))
    }

    /// Reject an index that exists or does not advance the line
    async fn check_window_index(&self, window_index: WindowIndex) -> ExecutorResult<()> {
        let line = self.config.line();
        if self.store.window_exists(&line, window_index).await? {
            return Err(RewardsError::WindowIndexCollision {
                chain_id: line.chain_id,
                contract: line.contract_address.to_string(),
                window_index,
            }
            .into());
        }
        if let Some(latest) = self.store.list_windows(&line).await?.last() {
            if latest.window_index > window_index {
                return Err(RewardsError::invalid_job_config(format!(
                    "window index {window_index} is below the latest window {} on {line}",
                    latest.window_index
                ))
                .into());
            }
        }
        Ok(())
    }

    // ============================================================
    // Build
    // ============================================================

    async fn build_window(&self, job: &RewardsWindowJob) -> ExecutorResult<WindowBuild> {
        let rewards_type = job.config.rewards_type;
        let cutoff = job.config.max_deposit_date;

        let snapshot = self.store.snapshot().await?;
        let claimed = snapshot.claimed_windows();
        let volumes = ReferralVolumeIndex::build(&snapshot.deposits, &claimed)?;
        debug!(
            deposits = snapshot.deposits.len(),
            claims = snapshot.claims.len(),
            referrals = volumes.referral_count(),
            "snapshot loaded"
        );

        let context = RewardContext {
            rewards_type,
            tiers: &self.tiers,
            multipliers: &self.multipliers,
            volumes: &volumes,
            reward_token_decimals: self.config.reward_token_decimals,
        };

        let mut aggregator = RecipientAggregator::new();
        let mut gaps = Vec::new();
        for deposit in snapshot
            .deposits
            .iter()
            .filter(|d| is_window_candidate(d, rewards_type, cutoff))
        {
            match DepositState::classify(deposit, rewards_type)? {
                DepositState::Priced(priced) => aggregator.add(context.compute(deposit, &priced)?),
                DepositState::Unpriced => {
                    warn!(
                        job_id = %job.job_id,
                        deposit = %deposit.key(),
                        reason = "no price snapshot",
                        "deposit excluded from window"
                    );
                    gaps.push(PricingGap {
                        deposit: deposit.key(),
                        reason: "no price snapshot".to_string(),
                    });
                }
                DepositState::Unfilled | DepositState::WindowAssigned(_) => {}
            }
        }

        let totals = aggregator.finish()?;
        let tree = build_window_tree(
            totals
                .iter()
                .map(|t| (t.address.clone(), t.amount.clone()))
                .collect(),
        )?;
        let by_address: BTreeMap<_, &RecipientTotal> = totals.iter().map(|t| (&t.address, t)).collect();

        let mut recipients = Vec::with_capacity(tree.leaves.len());
        for leaf in &tree.leaves {
            let total = by_address.get(&leaf.leaf.account).ok_or_else(|| {
                RewardsError::invariant(
                    "every leaf has an aggregate",
                    format!("leaf {} has no recipient total", leaf.leaf.account),
                )
            })?;
            recipients.push(MerkleDistributorRecipient {
                window_index: job.window_index,
                address: leaf.leaf.account.clone(),
                amount: to_plain_string(&leaf.leaf.amount),
                account_index: leaf.leaf.account_index,
                proof: leaf.proof.clone(),
                payload: serde_json::to_value(total.breakdown(rewards_type)).map_err(RewardsError::from)?,
            });
        }

        let rewards_to_deposit = to_plain_string(&tree.total_amount());
        let window = MerkleDistributorWindow {
            chain_id: self.config.chain_id,
            contract_address: self.config.contract_address.clone(),
            window_index: job.window_index,
            reward_token: self.config.reward_token.clone(),
            rewards_to_deposit: rewards_to_deposit.clone(),
            merkle_root: tree.root,
            ipfs_hash: None,
            rewards_type,
            job_id: job.job_id.clone(),
            created_at: Utc::now(),
        };

        // Zero-total recipients are out of the tree, so their deposits stay
        // unassigned and can count towards a later window.
        let deposits = totals.iter().flat_map(|t| t.deposits.iter().copied()).collect();
        let recipient_count = recipients.len();

        self.store
            .commit_window(WindowCommit {
                window,
                recipients,
                deposits,
                rewards_type,
            })
            .await?;

        Ok(WindowBuild {
            root: tree.root,
            recipient_count,
            rewards_to_deposit,
            gaps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ChainEvent, EventIngestor};
    use crate::pricing::DepositPricer;
    use chrono::{Duration, NaiveDate, TimeZone};
    use rewards_core::fee::parse_integer;
    use rewards_core::{
        verify_recipient, Address, DepositEvent, EventKey, EventMeta, FillEvent, HistoricMarketPrice,
        RewardsType, Token,
    };
    use rewards_store::{
        DepositRepository, InMemoryLedger, JobRepository, PriceRepository, TokenRepository, WindowRepository,
    };

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{}", "0".repeat(38) + &format!("{n:02x}"))).unwrap()
    }

    fn executor(store: Arc<InMemoryLedger>) -> RewardsWindowExecutor<InMemoryLedger> {
        let config = ExecutorConfig::default()
            .with_line(10, addr(0xd1))
            .with_reward_token(addr(0xaa), 18);
        RewardsWindowExecutor::new(store, config).unwrap()
    }

    async fn seed(store: &Arc<InMemoryLedger>, deposits: &[(u64, u8)]) {
        let date = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
        store.upsert_token(Token::new(addr(0xee), 1, "WETH", 18)).await.unwrap();
        store.upsert_token(Token::new(addr(0xaa), 10, "ACX", 18)).await.unwrap();
        store.insert_price(HistoricMarketPrice::new("WETH", date, "2000")).await.unwrap();
        store.insert_price(HistoricMarketPrice::new("ACX", date, "1")).await.unwrap();

        let ingestor = EventIngestor::new(store.clone(), parse_integer("c", "1000000000000000000").unwrap());
        let at = Utc.with_ymd_and_hms(2022, 8, 1, 12, 0, 0).unwrap();
        for &(id, depositor) in deposits {
            ingestor
                .ingest(ChainEvent::Deposit(DepositEvent {
                    meta: EventMeta::new(EventKey::new(1, format!("0xd{id}"), 0), id, at),
                    origin_chain_id: 1,
                    destination_chain_id: 10,
                    deposit_id: id,
                    depositor: addr(depositor),
                    recipient: addr(depositor),
                    input_token: addr(0xee),
                    input_amount: "1000000000000000000".to_string(),
                    output_token: None,
                    output_amount: None,
                    relayer_fee_pct: "1000000000000000".to_string(),
                    referral_address: Some(addr(0x77)),
                }))
                .await
                .unwrap();
            ingestor
                .ingest(ChainEvent::Fill(FillEvent {
                    meta: EventMeta::new(EventKey::new(10, format!("0xf{id}"), 0), id, at),
                    origin_chain_id: 1,
                    deposit_id: id,
                    relayer: addr(0x99),
                    realized_lp_fee_pct: "100000000000000".to_string(),
                    relayer_fee_pct: "1000000000000000".to_string(),
                    total_filled_amount: "1000000000000000000".to_string(),
                }))
                .await
                .unwrap();
        }
        DepositPricer::new(store.clone(), addr(0xaa), 10)
            .price_pending()
            .await
            .unwrap();
    }

    fn cutoff() -> JobConfig {
        JobConfig::new(Utc.with_ymd_and_hms(2022, 9, 1, 0, 0, 0).unwrap(), RewardsType::LpFee)
    }

    #[tokio::test]
    async fn test_job_builds_verifiable_window() {
        let store = Arc::new(InMemoryLedger::new());
        seed(&store, &[(1, 1), (2, 2), (3, 1)]).await;
        let executor = executor(store.clone());

        let report = executor.execute(0, cutoff()).await.unwrap();
        assert_eq!(report.status, JobStatus::Done);
        assert_eq!(report.recipient_count, 2);
        assert!(report.execution_time_seconds.is_some());

        let (window, recipients) = executor.artifacts(0).await.unwrap();
        assert_eq!(Some(window.merkle_root), report.merkle_root);
        for recipient in &recipients {
            assert!(verify_recipient(&window.merkle_root, recipient).unwrap());
        }
        // 0.2 USD LP fee x3 per deposit at 1 USD per reward token
        assert_eq!(recipients[0].amount, "1200000000000000000");
        assert_eq!(window.rewards_to_deposit, "1800000000000000000");

        let deposit = store.get_deposit_required(&rewards_core::DepositKey::new(1, 3)).await.unwrap();
        assert_eq!(deposit.window_for(RewardsType::LpFee), Some(0));
        assert_eq!(deposit.window_for(RewardsType::Referral), None);
    }

    #[tokio::test]
    async fn test_collision_rejected_before_transition() {
        let store = Arc::new(InMemoryLedger::new());
        seed(&store, &[(1, 1)]).await;
        let executor = executor(store.clone());
        executor.execute(0, cutoff()).await.unwrap();

        let err = executor.create_job(0, cutoff()).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, ExecutorError::Core(RewardsError::WindowIndexCollision { .. })));
    }

    #[tokio::test]
    async fn test_empty_window_fails_job() {
        let store = Arc::new(InMemoryLedger::new());
        let executor = executor(store.clone());

        let report = executor.execute(0, cutoff()).await.unwrap();
        assert_eq!(report.status, JobStatus::Failed);
        assert!(report.error.unwrap().contains("RW-JOB-006"));
        assert!(!store.window_exists(&executor.config().line(), 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_future_cutoff_is_configuration_error() {
        let executor = executor(Arc::new(InMemoryLedger::new()));
        let config = JobConfig::new(Utc::now() + Duration::days(1), RewardsType::LpFee);
        assert!(executor.create_job(0, config).await.unwrap_err().is_configuration());
        assert!(executor.list_jobs(JobStatus::Initial, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_job_cannot_rerun() {
        let store = Arc::new(InMemoryLedger::new());
        let executor = executor(store);
        let report = executor.execute(0, cutoff()).await.unwrap();
        assert_eq!(report.status, JobStatus::Failed);
        assert!(executor.run_job(&report.job_id).await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_orphaned_job_blocks_line_until_recovered() {
        let store = Arc::new(InMemoryLedger::new());
        seed(&store, &[(1, 1)]).await;
        let executor = executor(store.clone());

        // A worker died after starting the job
        let mut orphan = executor.create_job(0, cutoff()).await.unwrap();
        orphan.start().unwrap();
        store.update_job(orphan.clone()).await.unwrap();

        let next = executor.create_job(1, cutoff()).await.unwrap();
        assert!(executor.run_job(&next.job_id).await.unwrap_err().is_configuration());

        let recovered = executor.recover_job(&orphan.job_id, "worker lost").await.unwrap();
        assert_eq!(recovered.status, JobStatus::Failed);
        assert_eq!(recovered.error.as_deref(), Some("worker lost"));
        assert!(recovered.merkle_root.is_none());

        let report = executor.run_job(&next.job_id).await.unwrap();
        assert_eq!(report.status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_recover_keeps_committed_root() {
        let store = Arc::new(InMemoryLedger::new());
        seed(&store, &[(1, 1), (2, 2)]).await;
        let executor = executor(store.clone());
        let done = executor.execute(0, cutoff()).await.unwrap();

        // The window committed but the final job write was lost
        let mut stuck = store.get_job_required(&done.job_id).await.unwrap();
        stuck.status = JobStatus::InProgress;
        stuck.merkle_root = None;
        stuck.recipient_count = 0;
        stuck.execution_time_secs = None;
        store.update_job(stuck).await.unwrap();

        let recovered = executor.recover_job(&done.job_id, "worker lost").await.unwrap();
        assert_eq!(recovered.status, JobStatus::Done);
        assert_eq!(recovered.merkle_root, done.merkle_root);
        assert_eq!(recovered.recipient_count, 2);
        assert!(recovered.error.is_none());
        assert_eq!(executor.job_report(&done.job_id).await.unwrap().status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_recover_rejects_settled_jobs() {
        let store = Arc::new(InMemoryLedger::new());
        seed(&store, &[(1, 1)]).await;
        let executor = executor(store.clone());

        let initial = executor.create_job(0, cutoff()).await.unwrap();
        assert!(executor.recover_job(&initial.job_id, "x").await.unwrap_err().is_configuration());

        let done = executor.run_job(&initial.job_id).await.unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert!(executor.recover_job(&done.job_id, "x").await.unwrap_err().is_configuration());
    }
}
