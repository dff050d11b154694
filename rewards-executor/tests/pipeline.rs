//! End-to-end pipeline: ingest -> price -> window job -> claim -> next window

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rewards_core::{
    verify_recipient, Address, ClaimEvent, DepositEvent, DepositKey, EventKey, EventMeta, FillEvent,
    HistoricMarketPrice, JobConfig, JobStatus, RewardsError, RewardsType, Token,
};
use rewards_executor::{
    ChainEvent, ClaimTracker, DepositPricer, EventIngestor, ExecutorConfig, ExecutorError, IngestOutcome,
    RewardsWindowExecutor,
};
use rewards_store::{DepositRepository, InMemoryLedger, PriceRepository, TokenRepository, WindowRepository};
use std::sync::Arc;

const WETH: u8 = 0xee;
const ACX: u8 = 0xaa;
const REFERRER: u8 = 0x77;
const ONE_TOKEN: &str = "1000000000000000000";

fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{}", "0".repeat(38) + &format!("{n:02x}"))).unwrap()
}

fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, month, day, hour, 0, 0).unwrap()
}

struct Pipeline {
    store: Arc<InMemoryLedger>,
    ingestor: EventIngestor<InMemoryLedger>,
    pricer: DepositPricer<InMemoryLedger>,
    executor: RewardsWindowExecutor<InMemoryLedger>,
    claims: ClaimTracker<InMemoryLedger>,
}

impl Pipeline {
    async fn new() -> Self {
        let store = Arc::new(InMemoryLedger::new());
        let config = ExecutorConfig::default()
            .with_line(10, addr(0xd1))
            .with_reward_token(addr(ACX), 18);

        store.upsert_token(Token::new(addr(WETH), 1, "WETH", 18)).await.unwrap();
        store.upsert_token(Token::new(addr(ACX), 10, "ACX", 18)).await.unwrap();

        Self {
            ingestor: EventIngestor::new(store.clone(), config.lp_fee_cap().unwrap()),
            pricer: DepositPricer::new(store.clone(), addr(ACX), 10),
            claims: ClaimTracker::new(store.clone()),
            executor: RewardsWindowExecutor::new(store.clone(), config).unwrap(),
            store,
        }
    }

    async fn prices(&self, day: NaiveDate, reward_price: &str) {
        self.store
            .insert_price(HistoricMarketPrice::new("WETH", day, "2000"))
            .await
            .unwrap();
        self.store
            .insert_price(HistoricMarketPrice::new("ACX", day, reward_price))
            .await
            .unwrap();
    }

    /// One filled 1 WETH deposit with a 0.01% LP fee, referred by `REFERRER`
    async fn filled_deposit(&self, id: u64, depositor: u8, when: DateTime<Utc>) {
        let deposit = ChainEvent::Deposit(DepositEvent {
            meta: EventMeta::new(EventKey::new(1, format!("0xdeposit{id}"), 0), id, when),
            origin_chain_id: 1,
            destination_chain_id: 10,
            deposit_id: id,
            depositor: addr(depositor),
            recipient: addr(depositor),
            input_token: addr(WETH),
            input_amount: ONE_TOKEN.to_string(),
            output_token: Some(addr(0xef)),
            output_amount: Some(ONE_TOKEN.to_string()),
            relayer_fee_pct: "1000000000000000".to_string(),
            referral_address: Some(addr(REFERRER)),
        });
        let fill = ChainEvent::Fill(FillEvent {
            meta: EventMeta::new(EventKey::new(10, format!("0xfill{id}"), 0), id, when),
            origin_chain_id: 1,
            deposit_id: id,
            relayer: addr(0x99),
            realized_lp_fee_pct: "100000000000000".to_string(),
            relayer_fee_pct: "1000000000000000".to_string(),
            total_filled_amount: ONE_TOKEN.to_string(),
        });
        self.ingestor.ingest_all([deposit, fill]).await.unwrap();
    }

    async fn claim(&self, tx: &str, window_index: u64, account_index: u64, account: u8) -> IngestOutcome {
        let event = ChainEvent::Claim(ClaimEvent {
            meta: EventMeta::new(EventKey::new(10, tx, 0), 500, at(10, 2, 0)),
            window_index,
            account_index,
            caller: addr(account),
            account: addr(account),
            reward_token: addr(ACX),
            amount: "1".to_string(),
        });
        self.ingestor.ingest(event).await.unwrap()
    }
}

fn referral_job(cutoff: DateTime<Utc>) -> JobConfig {
    JobConfig::new(cutoff, RewardsType::Referral)
}

/// Three referred depositors in August, one in September
async fn seeded() -> Pipeline {
    let p = Pipeline::new().await;
    p.prices(NaiveDate::from_ymd_opt(2022, 8, 1).unwrap(), "1").await;
    p.prices(NaiveDate::from_ymd_opt(2022, 9, 10).unwrap(), "1").await;

    p.filled_deposit(1, 1, at(8, 1, 10)).await;
    p.filled_deposit(2, 2, at(8, 1, 11)).await;
    p.filled_deposit(3, 3, at(8, 1, 12)).await;

    let report = p.pricer.price_pending().await.unwrap();
    assert_eq!(report.priced, 3);
    assert!(report.gaps.is_empty());
    p
}

#[tokio::test]
async fn test_full_cycle_excludes_claimed_volume() {
    let p = seeded().await;

    // Window 0: referral counts 1, 2, 3 give rates 0.4, 0.4, 0.5 on 0.2 USD each, x3 in August
    let first = p.executor.execute(0, referral_job(at(9, 1, 0))).await.unwrap();
    assert_eq!(first.status, JobStatus::Done);
    assert_eq!(first.recipient_count, 1);

    let (window, recipients) = p.executor.artifacts(0).await.unwrap();
    assert_eq!(recipients.len(), 1);
    assert_eq!(recipients[0].address, addr(REFERRER));
    assert_eq!(recipients[0].amount, "780000000000000000");
    assert_eq!(window.rewards_to_deposit, "780000000000000000");

    // The referrer claims window 0
    assert_eq!(p.claim("0xclaim0", 0, 0, REFERRER).await, IngestOutcome::Applied);
    assert!(p.claims.has_claimed(&addr(REFERRER), 0).await.unwrap());

    // Window 1: only the September deposit counts, so the referrer is back to one referral at x2
    p.filled_deposit(4, 4, at(9, 10, 9)).await;
    assert_eq!(p.pricer.price_pending().await.unwrap().priced, 1);

    let second = p.executor.execute(1, referral_job(at(10, 1, 0))).await.unwrap();
    assert_eq!(second.status, JobStatus::Done);
    let (_, recipients) = p.executor.artifacts(1).await.unwrap();
    assert_eq!(recipients[0].amount, "160000000000000000");

    let stamped = p.store.get_deposit_required(&DepositKey::new(1, 4)).await.unwrap();
    assert_eq!(stamped.window_for(RewardsType::Referral), Some(1));
    assert_eq!(p.claims.latest_claimed_window(&addr(REFERRER)).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_unclaimed_volume_keeps_counting() {
    let p = seeded().await;
    p.executor.execute(0, referral_job(at(9, 1, 0))).await.unwrap();

    // No claim: the August deposits still count, four referrals give 0.5 at x2
    p.filled_deposit(4, 4, at(9, 10, 9)).await;
    p.pricer.price_pending().await.unwrap();
    p.executor.execute(1, referral_job(at(10, 1, 0))).await.unwrap();

    let (_, recipients) = p.executor.artifacts(1).await.unwrap();
    assert_eq!(recipients[0].amount, "200000000000000000");
}

#[tokio::test]
async fn test_every_recipient_proof_matches_root() {
    let p = seeded().await;
    let config = JobConfig::new(at(9, 1, 0), RewardsType::BridgeFee);
    let report = p.executor.execute(0, config).await.unwrap();
    assert_eq!(report.recipient_count, 3);

    let (window, recipients) = p.executor.artifacts(0).await.unwrap();
    for (index, recipient) in recipients.iter().enumerate() {
        assert_eq!(recipient.account_index, index as u64);
        assert!(verify_recipient(&window.merkle_root, recipient).unwrap());
    }
    let mut addresses: Vec<_> = recipients.iter().map(|r| r.address.clone()).collect();
    addresses.sort();
    assert_eq!(addresses, recipients.iter().map(|r| r.address.clone()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_existing_window_is_never_rebuilt() {
    let p = seeded().await;
    let line = p.executor.config().line();

    // Two jobs race for the same index; only the first one builds
    let config = referral_job(at(9, 1, 0));
    let a = p.executor.create_job(0, config.clone()).await.unwrap();
    let b = p.executor.create_job(0, config.clone()).await.unwrap();
    assert_eq!(p.executor.run_job(&a.job_id).await.unwrap().status, JobStatus::Done);

    let before = p.store.get_window_required(&line, 0).await.unwrap();
    let recipients_before = p.store.window_recipients(&line, 0).await.unwrap();

    let err = p.executor.run_job(&b.job_id).await.unwrap_err();
    assert!(matches!(err, ExecutorError::Core(RewardsError::WindowIndexCollision { .. })));
    assert_eq!(p.executor.job_report(&b.job_id).await.unwrap().status, JobStatus::Initial);

    let err = p.executor.create_job(0, config).await.unwrap_err();
    assert!(err.is_configuration());

    assert_eq!(p.store.get_window_required(&line, 0).await.unwrap(), before);
    assert_eq!(p.store.window_recipients(&line, 0).await.unwrap(), recipients_before);
}

#[tokio::test]
async fn test_failed_job_leaves_no_trace() {
    let p = seeded().await;

    // A later deposit priced against a zero reward-token price aborts the build
    p.prices(NaiveDate::from_ymd_opt(2022, 8, 2).unwrap(), "0").await;
    p.filled_deposit(9, 9, at(8, 2, 9)).await;
    p.pricer.price_pending().await.unwrap();

    let report = p
        .executor
        .execute(0, JobConfig::new(at(9, 1, 0), RewardsType::LpFee))
        .await
        .unwrap();
    assert_eq!(report.status, JobStatus::Failed);
    assert!(report.error.unwrap().contains("RW-PRICE"));

    let line = p.executor.config().line();
    assert!(!p.store.window_exists(&line, 0).await.unwrap());
    assert!(p.store.window_recipients(&line, 0).await.unwrap().is_empty());
    for deposit in p.store.list_deposits().await.unwrap() {
        assert!(deposit.reward_windows.is_empty(), "{} was stamped", deposit.key());
    }

    // The operator starts a fresh job once the data is fixed
    assert_eq!(p.executor.list_jobs(JobStatus::Failed, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_redelivered_claims_are_absorbed() {
    let p = seeded().await;
    p.executor.execute(0, referral_job(at(9, 1, 0))).await.unwrap();

    assert_eq!(p.claim("0xclaim", 0, 0, REFERRER).await, IngestOutcome::Applied);
    // Same log redelivered
    assert_eq!(p.claim("0xclaim", 0, 0, REFERRER).await, IngestOutcome::Duplicate);
    // Same claim seen through another log record
    assert_eq!(p.claim("0xother", 0, 0, REFERRER).await, IngestOutcome::Duplicate);

    assert_eq!(p.claims.claims_for_window(0).await.unwrap().len(), 1);
    let status = p
        .claims
        .recipient_status(&p.executor.config().line(), 0)
        .await
        .unwrap();
    assert!(status.iter().all(|s| s.is_claimed()));
}

#[tokio::test]
async fn test_reward_types_have_independent_windows() {
    let p = seeded().await;
    let cutoff = at(9, 1, 0);

    p.executor.execute(0, JobConfig::new(cutoff, RewardsType::LpFee)).await.unwrap();
    let referral = p.executor.execute(1, referral_job(cutoff)).await.unwrap();
    assert_eq!(referral.status, JobStatus::Done);

    let deposit = p.store.get_deposit_required(&DepositKey::new(1, 1)).await.unwrap();
    assert_eq!(deposit.window_for(RewardsType::LpFee), Some(0));
    assert_eq!(deposit.window_for(RewardsType::Referral), Some(1));

    // Nothing left for another LP fee window
    let empty = p.executor.execute(2, JobConfig::new(cutoff, RewardsType::LpFee)).await.unwrap();
    assert_eq!(empty.status, JobStatus::Failed);
    assert_eq!(p.executor.list_jobs(JobStatus::Done, 10).await.unwrap().len(), 2);
}
