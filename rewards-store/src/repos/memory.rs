//! In-memory ledger
//!
//! All tables live behind one lock, so a snapshot sees deposits and claims
//! from the same instant and a window commit is applied as a unit.

use super::ledger_repo::*;
use super::window_repo::*;
use crate::error::{StoreError, StoreResult};
use crate::snapshot::LedgerSnapshot;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rewards_core::{
    Address, ChainId, Claim, Deposit, DepositKey, DistributionLine, EventKey, FillRecord,
    HistoricMarketPrice, JobId, JobStatus, MerkleDistributorRecipient, MerkleDistributorWindow,
    PoolRebalanceRoute, PriceSnapshot, Refund, RewardsWindowJob, Token, WindowIndex,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
struct LedgerState {
    events: HashSet<EventKey>,
    deposits: BTreeMap<DepositKey, Deposit>,
    parked_fills: HashMap<DepositKey, Vec<FillRecord>>,
    sticky_referrals: HashMap<Address, Address>,
    tokens: HashMap<(Address, ChainId), Token>,
    prices: HashMap<(String, NaiveDate), HistoricMarketPrice>,
    routes: HashMap<(Address, ChainId), PoolRebalanceRoute>,
    refunds: BTreeMap<EventKey, Refund>,
    claims: BTreeMap<(WindowIndex, u64), Claim>,
    windows: BTreeMap<(DistributionLine, WindowIndex), MerkleDistributorWindow>,
    recipients: HashMap<(DistributionLine, WindowIndex), Vec<MerkleDistributorRecipient>>,
    jobs: HashMap<JobId, RewardsWindowJob>,
}

/// In-memory implementation of every repository trait
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLogRepository for InMemoryLedger {
    async fn record_event(&self, key: &EventKey) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.events.insert(key.clone()))
    }

    async fn has_event(&self, key: &EventKey) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.events.contains(key))
    }
}

#[async_trait]
impl DepositRepository for InMemoryLedger {
    async fn insert_deposit(&self, deposit: Deposit) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = deposit.key();
        if state.deposits.contains_key(&key) {
            return Err(StoreError::duplicate("Deposit", key.to_string()));
        }
        state.deposits.insert(key, deposit);
        Ok(())
    }

    async fn get_deposit(&self, key: &DepositKey) -> StoreResult<Option<Deposit>> {
        let state = self.state.read().await;
        Ok(state.deposits.get(key).cloned())
    }

    async fn update_deposit(&self, deposit: Deposit) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = deposit.key();
        match state.deposits.get_mut(&key) {
            Some(existing) => {
                *existing = deposit;
                Ok(())
            }
            None => Err(StoreError::not_found("Deposit", key.to_string())),
        }
    }

    async fn set_deposit_price(&self, key: &DepositKey, price: PriceSnapshot) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let deposit = state
            .deposits
            .get_mut(key)
            .ok_or_else(|| StoreError::not_found("Deposit", key.to_string()))?;
        if deposit.price.is_some() {
            return Ok(false);
        }
        deposit.set_price(price);
        Ok(true)
    }

    async fn list_deposits(&self) -> StoreResult<Vec<Deposit>> {
        let state = self.state.read().await;
        Ok(state.deposits.values().cloned().collect())
    }

    async fn park_fill(&self, fill: FillRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.parked_fills.entry(fill.deposit).or_default().push(fill);
        Ok(())
    }

    async fn take_parked_fills(&self, key: &DepositKey) -> StoreResult<Vec<FillRecord>> {
        let mut state = self.state.write().await;
        Ok(state.parked_fills.remove(key).unwrap_or_default())
    }

    async fn sticky_referral(&self, depositor: &Address) -> StoreResult<Option<Address>> {
        let state = self.state.read().await;
        Ok(state.sticky_referrals.get(depositor).cloned())
    }

    async fn set_sticky_referral_if_absent(
        &self,
        depositor: &Address,
        referral: &Address,
    ) -> StoreResult<Address> {
        let mut state = self.state.write().await;
        let current = state
            .sticky_referrals
            .entry(depositor.clone())
            .or_insert_with(|| referral.clone());
        Ok(current.clone())
    }
}

#[async_trait]
impl TokenRepository for InMemoryLedger {
    async fn upsert_token(&self, token: Token) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .tokens
            .insert((token.address.clone(), token.chain_id), token);
        Ok(())
    }

    async fn get_token(&self, address: &Address, chain_id: ChainId) -> StoreResult<Option<Token>> {
        let state = self.state.read().await;
        Ok(state.tokens.get(&(address.clone(), chain_id)).cloned())
    }
}

#[async_trait]
impl PriceRepository for InMemoryLedger {
    async fn insert_price(&self, price: HistoricMarketPrice) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let key = (price.symbol.to_ascii_uppercase(), price.date);
        if state.prices.contains_key(&key) {
            return Ok(false);
        }
        state.prices.insert(key, price);
        Ok(true)
    }

    async fn get_price(&self, symbol: &str, date: NaiveDate) -> StoreResult<Option<HistoricMarketPrice>> {
        let state = self.state.read().await;
        Ok(state
            .prices
            .get(&(symbol.to_ascii_uppercase(), date))
            .cloned())
    }
}

#[async_trait]
impl RouteRepository for InMemoryLedger {
    async fn upsert_route(&self, route: PoolRebalanceRoute) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .routes
            .insert((route.l1_token.clone(), route.destination_chain_id), route);
        Ok(())
    }

    async fn resolve_route(
        &self,
        l1_token: &Address,
        destination_chain_id: ChainId,
    ) -> StoreResult<Option<Address>> {
        let state = self.state.read().await;
        Ok(state
            .routes
            .get(&(l1_token.clone(), destination_chain_id))
            .map(|r| r.destination_token.clone()))
    }
}

#[async_trait]
impl RefundRepository for InMemoryLedger {
    async fn insert_refund(&self, refund: Refund) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.refunds.contains_key(&refund.meta.key) {
            return Ok(false);
        }
        state.refunds.insert(refund.meta.key.clone(), refund);
        Ok(true)
    }

    async fn refunds_for_relayer(&self, relayer: &Address) -> StoreResult<Vec<Refund>> {
        let state = self.state.read().await;
        Ok(state
            .refunds
            .values()
            .filter(|r| r.relayer == *relayer)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClaimRepository for InMemoryLedger {
    async fn insert_claim(&self, claim: Claim) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let key = claim.key();
        if state.claims.contains_key(&key) {
            return Ok(false);
        }
        state.claims.insert(key, claim);
        Ok(true)
    }

    async fn get_claim(&self, window_index: WindowIndex, account_index: u64) -> StoreResult<Option<Claim>> {
        let state = self.state.read().await;
        Ok(state.claims.get(&(window_index, account_index)).cloned())
    }

    async fn claims_for_account(&self, account: &Address) -> StoreResult<Vec<Claim>> {
        let state = self.state.read().await;
        Ok(state
            .claims
            .values()
            .filter(|c| c.account == *account)
            .cloned()
            .collect())
    }

    async fn claims_for_window(&self, window_index: WindowIndex) -> StoreResult<Vec<Claim>> {
        let state = self.state.read().await;
        Ok(state
            .claims
            .range((window_index, 0)..=(window_index, u64::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }
}

#[async_trait]
impl WindowRepository for InMemoryLedger {
    async fn window_exists(&self, line: &DistributionLine, window_index: WindowIndex) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.windows.contains_key(&(line.clone(), window_index)))
    }

    async fn get_window(
        &self,
        line: &DistributionLine,
        window_index: WindowIndex,
    ) -> StoreResult<Option<MerkleDistributorWindow>> {
        let state = self.state.read().await;
        Ok(state.windows.get(&(line.clone(), window_index)).cloned())
    }

    async fn list_windows(&self, line: &DistributionLine) -> StoreResult<Vec<MerkleDistributorWindow>> {
        let state = self.state.read().await;
        Ok(state
            .windows
            .iter()
            .filter(|((l, _), _)| l == line)
            .map(|(_, w)| w.clone())
            .collect())
    }

    async fn window_recipients(
        &self,
        line: &DistributionLine,
        window_index: WindowIndex,
    ) -> StoreResult<Vec<MerkleDistributorRecipient>> {
        let state = self.state.read().await;
        Ok(state
            .recipients
            .get(&(line.clone(), window_index))
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_window(&self, commit: WindowCommit) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let line = commit.window.line();
        let index = commit.window.window_index;
        let key = (line.clone(), index);

        // Validate everything before the first write
        if state.windows.contains_key(&key) {
            return Err(StoreError::conflict(format!(
                "window {index} already exists on {line}"
            )));
        }

        let mut seen = HashSet::new();
        for recipient in &commit.recipients {
            if recipient.window_index != index {
                return Err(StoreError::invalid_state(format!(
                    "recipient {} belongs to window {}, not {index}",
                    recipient.address, recipient.window_index
                )));
            }
            if !seen.insert(&recipient.address) {
                return Err(StoreError::duplicate(
                    "MerkleDistributorRecipient",
                    format!("{line}#{index}/{}", recipient.address),
                ));
            }
        }

        let mut stamped = Vec::with_capacity(commit.deposits.len());
        for deposit_key in &commit.deposits {
            let mut deposit = state
                .deposits
                .get(deposit_key)
                .cloned()
                .ok_or_else(|| StoreError::not_found("Deposit", deposit_key.to_string()))?;
            deposit.assign_window(commit.rewards_type, index)?;
            stamped.push(deposit);
        }

        let mut recipients = commit.recipients;
        recipients.sort_by_key(|r| r.account_index);
        let recipient_count = recipients.len();
        let merkle_root = commit.window.merkle_root;

        for deposit in stamped {
            state.deposits.insert(deposit.key(), deposit);
        }
        state.recipients.insert(key.clone(), recipients);
        state.windows.insert(key, commit.window);

        debug!(window_index = index, line = %line, "window rows written");
        info!(
            window_index = index,
            merkle_root = %merkle_root,
            recipients = recipient_count,
            deposits = commit.deposits.len(),
            "window committed"
        );
        Ok(())
    }
}

#[async_trait]
impl JobRepository for InMemoryLedger {
    async fn create_job(&self, job: RewardsWindowJob) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.jobs.contains_key(&job.job_id) {
            return Err(StoreError::duplicate("RewardsWindowJob", job.job_id.as_str()));
        }
        state.jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> StoreResult<Option<RewardsWindowJob>> {
        let state = self.state.read().await;
        Ok(state.jobs.get(job_id).cloned())
    }

    async fn update_job(&self, job: RewardsWindowJob) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.jobs.get_mut(&job.job_id) {
            Some(existing) => {
                *existing = job;
                Ok(())
            }
            None => Err(StoreError::not_found("RewardsWindowJob", job.job_id.as_str())),
        }
    }

    async fn list_jobs_by_status(&self, status: JobStatus, limit: usize) -> StoreResult<Vec<RewardsWindowJob>> {
        let state = self.state.read().await;
        let mut jobs: Vec<_> = state
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs.truncate(limit);
        Ok(jobs)
    }
}

#[async_trait]
impl SnapshotSource for InMemoryLedger {
    async fn snapshot(&self) -> StoreResult<LedgerSnapshot> {
        let state = self.state.read().await;
        Ok(LedgerSnapshot {
            taken_at: Utc::now(),
            deposits: state.deposits.values().cloned().collect(),
            claims: state.claims.values().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rewards_core::fee::parse_integer;
    use rewards_core::{Bytes32, DepositStatus, EventMeta, FeeBreakdown, JobConfig, RewardsType};
    use std::collections::BTreeMap as Map;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{}", "0".repeat(38) + &format!("{n:02x}"))).unwrap()
    }

    fn line() -> DistributionLine {
        DistributionLine::new(10, addr(0xd1))
    }

    fn deposit(id: u64, filled: bool) -> Deposit {
        Deposit {
            origin_chain_id: 1,
            destination_chain_id: 10,
            deposit_id: id,
            depositor: addr(1),
            recipient: addr(1),
            input_token: addr(0xee),
            input_amount: "100".to_string(),
            output_token: None,
            output_amount: None,
            status: if filled { DepositStatus::Filled } else { DepositStatus::Pending },
            deposit_date: Utc.with_ymd_and_hms(2022, 8, 1, 0, 0, 0).unwrap(),
            deposit_tx: format!("0x{id}"),
            fill_date: None,
            fill_tx: None,
            filled_amount: "0".to_string(),
            relayer_fee_pct: "0".to_string(),
            fees: filled.then(|| FeeBreakdown {
                realized_lp_fee_pct_raw: "1".to_string(),
                realized_lp_fee_pct: "1".to_string(),
                relayer_fee_pct: "0".to_string(),
                bridge_fee_pct: "1".to_string(),
            }),
            price: None,
            sticky_referral_address: None,
            reward_windows: Map::new(),
        }
    }

    fn commit(index: WindowIndex, deposits: Vec<DepositKey>) -> WindowCommit {
        let config = JobConfig::new(Utc::now(), RewardsType::LpFee);
        let job = RewardsWindowJob::new(index, config);
        WindowCommit {
            window: MerkleDistributorWindow {
                chain_id: 10,
                contract_address: addr(0xd1),
                window_index: index,
                reward_token: addr(0xaa),
                rewards_to_deposit: "5".to_string(),
                merkle_root: Bytes32::keccak256(b"root"),
                ipfs_hash: None,
                rewards_type: RewardsType::LpFee,
                job_id: job.job_id,
                created_at: Utc::now(),
            },
            recipients: vec![MerkleDistributorRecipient {
                window_index: index,
                address: addr(1),
                amount: "5".to_string(),
                account_index: 0,
                proof: vec![],
                payload: serde_json::json!({}),
            }],
            deposits,
            rewards_type: RewardsType::LpFee,
        }
    }

    #[tokio::test]
    async fn test_event_log_dedup() {
        let ledger = InMemoryLedger::new();
        let key = EventKey::new(1, "0xAB", 0);
        assert!(ledger.record_event(&key).await.unwrap());
        assert!(!ledger.record_event(&EventKey::new(1, "0xab", 0)).await.unwrap());
        assert!(ledger.has_event(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_deposit_uniqueness() {
        let ledger = InMemoryLedger::new();
        ledger.insert_deposit(deposit(1, false)).await.unwrap();
        assert!(matches!(
            ledger.insert_deposit(deposit(1, false)).await,
            Err(StoreError::Duplicate { .. })
        ));
        assert!(ledger.update_deposit(deposit(2, false)).await.is_err());
    }

    #[tokio::test]
    async fn test_sticky_referral_first_touch() {
        let ledger = InMemoryLedger::new();
        let first = ledger.set_sticky_referral_if_absent(&addr(1), &addr(7)).await.unwrap();
        let second = ledger.set_sticky_referral_if_absent(&addr(1), &addr(8)).await.unwrap();
        assert_eq!(first, addr(7));
        assert_eq!(second, addr(7));
    }

    #[tokio::test]
    async fn test_price_is_append_only() {
        let ledger = InMemoryLedger::new();
        let date = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
        assert!(ledger.insert_price(HistoricMarketPrice::new("weth", date, "1500")).await.unwrap());
        assert!(!ledger.insert_price(HistoricMarketPrice::new("WETH", date, "1600")).await.unwrap());
        let price = ledger.get_price("weth", date).await.unwrap().unwrap();
        assert_eq!(price.usd, "1500");
    }

    #[tokio::test]
    async fn test_claims_idempotent() {
        let ledger = InMemoryLedger::new();
        let claim = Claim {
            window_index: 0,
            account_index: 3,
            caller: addr(1),
            account: addr(1),
            reward_token: addr(0xaa),
            amount: "5".to_string(),
            block_number: 10,
            claimed_at: Utc::now(),
            transaction_hash: "0x01".to_string(),
        };
        assert!(ledger.insert_claim(claim.clone()).await.unwrap());
        assert!(!ledger.insert_claim(claim).await.unwrap());
        assert_eq!(ledger.claims_for_window(0).await.unwrap().len(), 1);
        assert!(ledger.claims_for_window(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_window_stamps_deposits() {
        let ledger = InMemoryLedger::new();
        ledger.insert_deposit(deposit(1, true)).await.unwrap();

        ledger.commit_window(commit(0, vec![DepositKey::new(1, 1)])).await.unwrap();

        assert!(ledger.window_exists(&line(), 0).await.unwrap());
        assert_eq!(ledger.window_recipients(&line(), 0).await.unwrap().len(), 1);
        let d = ledger.get_deposit_required(&DepositKey::new(1, 1)).await.unwrap();
        assert_eq!(d.window_for(RewardsType::LpFee), Some(0));
    }

    #[tokio::test]
    async fn test_commit_window_is_all_or_nothing() {
        let ledger = InMemoryLedger::new();
        ledger.insert_deposit(deposit(1, true)).await.unwrap();
        ledger.insert_deposit(deposit(2, false)).await.unwrap();

        // deposit 2 is unfilled: nothing may be written
        let result = ledger
            .commit_window(commit(0, vec![DepositKey::new(1, 1), DepositKey::new(1, 2)]))
            .await;
        assert!(result.is_err());
        assert!(!ledger.window_exists(&line(), 0).await.unwrap());
        let d = ledger.get_deposit_required(&DepositKey::new(1, 1)).await.unwrap();
        assert_eq!(d.window_for(RewardsType::LpFee), None);
    }

    #[tokio::test]
    async fn test_commit_window_rejects_existing_triple() {
        let ledger = InMemoryLedger::new();
        ledger.insert_deposit(deposit(1, true)).await.unwrap();
        ledger.insert_deposit(deposit(2, true)).await.unwrap();
        ledger.commit_window(commit(0, vec![DepositKey::new(1, 1)])).await.unwrap();

        let result = ledger.commit_window(commit(0, vec![DepositKey::new(1, 2)])).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        let d = ledger.get_deposit_required(&DepositKey::new(1, 2)).await.unwrap();
        assert_eq!(d.window_for(RewardsType::LpFee), None);
    }

    #[tokio::test]
    async fn test_snapshot_and_claimed_windows() {
        let ledger = InMemoryLedger::new();
        ledger.insert_deposit(deposit(1, true)).await.unwrap();
        let meta = EventMeta::new(EventKey::new(10, "0x02", 0), 1, Utc::now());
        let claim = Claim::from(&rewards_core::ClaimEvent {
            meta,
            window_index: 4,
            account_index: 0,
            caller: addr(9),
            account: addr(9),
            reward_token: addr(0xaa),
            amount: "1".to_string(),
        });
        ledger.insert_claim(claim).await.unwrap();

        let snapshot = ledger.snapshot().await.unwrap();
        assert_eq!(snapshot.deposits.len(), 1);
        let claimed = snapshot.claimed_windows();
        assert!(claimed[&addr(9)].contains(&4));
    }

    #[tokio::test]
    async fn test_list_jobs_by_status() {
        let ledger = InMemoryLedger::new();
        let config = JobConfig::new(Utc::now(), RewardsType::Referral);
        let mut job = RewardsWindowJob::new(0, config.clone());
        ledger.create_job(job.clone()).await.unwrap();
        ledger.create_job(RewardsWindowJob::new(1, config)).await.unwrap();

        job.start().unwrap();
        ledger.update_job(job).await.unwrap();

        assert_eq!(ledger.list_jobs_by_status(JobStatus::Initial, 10).await.unwrap().len(), 1);
        assert_eq!(ledger.list_jobs_by_status(JobStatus::InProgress, 10).await.unwrap().len(), 1);
    }
}
