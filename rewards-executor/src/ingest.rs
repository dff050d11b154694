//! Event Ingestion
//!
//! Applies ordered on-chain log records to the ledger. Every record is
//! guarded by its (chainId, transactionHash, logIndex) key, so redelivery is
//! a no-op. The key is marked only once the record has been applied; a record
//! that failed is retried in full when it is delivered again.

use crate::claims::ClaimTracker;
use crate::error::ExecutorResult;
use bigdecimal::BigDecimal;
use rewards_core::{
    ClaimEvent, Deposit, DepositEvent, EventMeta, FillEvent, FillOutcome, FillRecord,
    PoolRebalanceRoute, Refund, SpeedUpEvent,
};
use rewards_store::{LedgerStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One log record from the bridge or distributor contracts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChainEvent {
    Deposit(DepositEvent),
    Fill(FillEvent),
    SpeedUp(SpeedUpEvent),
    Refund(Refund),
    Claim(ClaimEvent),
    PoolRebalanceRoute(PoolRebalanceRoute),
}

impl ChainEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            ChainEvent::Deposit(e) => &e.meta,
            ChainEvent::Fill(e) => &e.meta,
            ChainEvent::SpeedUp(e) => &e.meta,
            ChainEvent::Refund(e) => &e.meta,
            ChainEvent::Claim(e) => &e.meta,
            ChainEvent::PoolRebalanceRoute(e) => &e.meta,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChainEvent::Deposit(_) => "deposit",
            ChainEvent::Fill(_) => "fill",
            ChainEvent::SpeedUp(_) => "speed_up",
            ChainEvent::Refund(_) => "refund",
            ChainEvent::Claim(_) => "claim",
            ChainEvent::PoolRebalanceRoute(_) => "pool_rebalance_route",
        }
    }
}

/// What ingesting a record did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Ledger changed
    Applied,
    /// Event key (or natural key) already seen
    Duplicate,
    /// Fill stored until its deposit arrives
    Parked,
    /// Valid record with no effect (late speed-up, fill on a filled deposit)
    Ignored,
}

/// Ingestion counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub applied: usize,
    pub duplicates: usize,
    pub parked: usize,
    pub ignored: usize,
}

impl IngestSummary {
    fn count(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Applied => self.applied += 1,
            IngestOutcome::Duplicate => self.duplicates += 1,
            IngestOutcome::Parked => self.parked += 1,
            IngestOutcome::Ignored => self.ignored += 1,
        }
    }
}

pub struct EventIngestor<S: LedgerStore + ?Sized> {
    store: Arc<S>,
    claims: ClaimTracker<S>,
    lp_fee_cap: BigDecimal,
}

impl<S: LedgerStore + ?Sized> EventIngestor<S> {
    pub fn new(store: Arc<S>, lp_fee_cap: BigDecimal) -> Self {
        Self {
            claims: ClaimTracker::new(store.clone()),
            store,
            lp_fee_cap,
        }
    }

    /// Ingest records in order
    pub async fn ingest_all(&self, events: impl IntoIterator<Item = ChainEvent>) -> ExecutorResult<IngestSummary> {
        let mut summary = IngestSummary::default();
        for event in events {
            summary.count(self.ingest(event).await?);
        }
        info!(
            applied = summary.applied,
            duplicates = summary.duplicates,
            parked = summary.parked,
            ignored = summary.ignored,
            "ingestion finished"
        );
        Ok(summary)
    }

    pub async fn ingest(&self, event: ChainEvent) -> ExecutorResult<IngestOutcome> {
        let key = event.meta().key.clone();
        let kind = event.kind();
        if self.store.has_event(&key).await? {
            debug!(event = %key, kind, "duplicate event ignored");
            return Ok(IngestOutcome::Duplicate);
        }

        // Handlers are idempotent on natural keys, so a concurrent redelivery
        // racing past the check above cannot apply a record twice.
        let outcome = match event {
            ChainEvent::Deposit(e) => self.ingest_deposit(e).await,
            ChainEvent::Fill(e) => self.ingest_fill(e).await,
            ChainEvent::SpeedUp(e) => self.ingest_speed_up(e).await,
            ChainEvent::Refund(e) => self.ingest_refund(e).await,
            ChainEvent::Claim(e) => self.ingest_claim(e).await,
            ChainEvent::PoolRebalanceRoute(e) => self.ingest_route(e).await,
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(event = %key, kind, error = %e, "event not applied; key left unmarked");
                return Err(e);
            }
        };

        if !self.store.record_event(&key).await? {
            debug!(event = %key, kind, "event key marked by a concurrent delivery");
        }
        Ok(outcome)
    }

    async fn ingest_deposit(&self, event: DepositEvent) -> ExecutorResult<IngestOutcome> {
        let mut deposit = event.to_deposit();

        if deposit.output_token.is_none() {
            deposit.output_token = self
                .store
                .resolve_route(&deposit.input_token, deposit.destination_chain_id)
                .await?;
        }

        // First touch wins
        let sticky = match (self.store.sticky_referral(&deposit.depositor).await?, &event.referral_address) {
            (Some(existing), _) => Some(existing),
            (None, Some(referral)) => Some(
                self.store
                    .set_sticky_referral_if_absent(&deposit.depositor, referral)
                    .await?,
            ),
            (None, None) => None,
        };
        if let Some(referral) = sticky {
            deposit.set_sticky_referral(referral)?;
        }

        let key = deposit.key();
        let parked = self.store.take_parked_fills(&key).await?;
        let result = self.reconcile_and_insert(deposit, &parked).await;
        if result.is_err() {
            // Fills stay parked for the redelivered deposit
            for fill in parked {
                self.store.park_fill(fill).await?;
            }
        }
        result
    }

    async fn reconcile_and_insert(&self, mut deposit: Deposit, parked: &[FillRecord]) -> ExecutorResult<IngestOutcome> {
        for fill in parked {
            let outcome = deposit.apply_fill(fill, &self.lp_fee_cap)?;
            debug!(deposit = %deposit.key(), ?outcome, "parked fill reconciled");
        }

        let key = deposit.key();
        match self.store.insert_deposit(deposit).await {
            Ok(()) => {
                debug!(deposit = %key, "deposit recorded");
                Ok(IngestOutcome::Applied)
            }
            Err(StoreError::Duplicate { .. }) => {
                warn!(deposit = %key, "deposit id already recorded under another event");
                Ok(IngestOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ingest_fill(&self, event: FillEvent) -> ExecutorResult<IngestOutcome> {
        let fill = event.to_record();
        let Some(mut deposit) = self.store.get_deposit(&fill.deposit).await? else {
            debug!(deposit = %fill.deposit, "fill parked until deposit arrives");
            self.store.park_fill(fill).await?;
            return Ok(IngestOutcome::Parked);
        };

        match deposit.apply_fill(&fill, &self.lp_fee_cap)? {
            FillOutcome::AlreadyFilled => {
                debug!(deposit = %fill.deposit, "fill on filled deposit absorbed");
                Ok(IngestOutcome::Ignored)
            }
            outcome => {
                self.store.update_deposit(deposit).await?;
                debug!(deposit = %fill.deposit, ?outcome, "fill applied");
                Ok(IngestOutcome::Applied)
            }
        }
    }

    async fn ingest_speed_up(&self, event: SpeedUpEvent) -> ExecutorResult<IngestOutcome> {
        let Some(mut deposit) = self.store.get_deposit(&event.key()).await? else {
            warn!(deposit = %event.key(), "speed-up for unknown deposit");
            return Ok(IngestOutcome::Ignored);
        };
        if !deposit.apply_speed_up(&event.new_relayer_fee_pct)? {
            debug!(deposit = %event.key(), "speed-up after fill ignored");
            return Ok(IngestOutcome::Ignored);
        }
        self.store.update_deposit(deposit).await?;
        Ok(IngestOutcome::Applied)
    }

    async fn ingest_refund(&self, refund: Refund) -> ExecutorResult<IngestOutcome> {
        if self.store.insert_refund(refund).await? {
            Ok(IngestOutcome::Applied)
        } else {
            Ok(IngestOutcome::Duplicate)
        }
    }

    async fn ingest_claim(&self, event: ClaimEvent) -> ExecutorResult<IngestOutcome> {
        if self.claims.record_claim(&event).await? {
            Ok(IngestOutcome::Applied)
        } else {
            Ok(IngestOutcome::Duplicate)
        }
    }

    async fn ingest_route(&self, route: PoolRebalanceRoute) -> ExecutorResult<IngestOutcome> {
        self.store.upsert_route(route).await?;
        Ok(IngestOutcome::Applied)
    }
}
