//! Ledger Repositories
//!
//! Event log, deposits, market data, routes and refunds.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rewards_core::{
    Address, ChainId, Deposit, DepositKey, EventKey, FillRecord, HistoricMarketPrice,
    PoolRebalanceRoute, PriceSnapshot, Refund, Token,
};

/// Redelivery guard for on-chain log records
#[async_trait]
pub trait EventLogRepository: Send + Sync {
    /// Record an event key. Returns `false` when the key was already seen.
    async fn record_event(&self, key: &EventKey) -> StoreResult<bool>;

    /// Check whether an event key was seen
    async fn has_event(&self, key: &EventKey) -> StoreResult<bool>;
}

/// Deposit repository trait
#[async_trait]
pub trait DepositRepository: Send + Sync {
    /// Insert a new deposit; `Duplicate` if the key exists
    async fn insert_deposit(&self, deposit: Deposit) -> StoreResult<()>;

    /// Get deposit by key
    async fn get_deposit(&self, key: &DepositKey) -> StoreResult<Option<Deposit>>;

    /// Get deposit by key, error if not found
    async fn get_deposit_required(&self, key: &DepositKey) -> StoreResult<Deposit> {
        self.get_deposit(key)
            .await?
            .ok_or_else(|| StoreError::not_found("Deposit", key.to_string()))
    }

    /// Replace an existing deposit row
    async fn update_deposit(&self, deposit: Deposit) -> StoreResult<()>;

    /// Attach a price snapshot to a deposit that has none.
    /// Returns `false` when the deposit was already priced.
    async fn set_deposit_price(&self, key: &DepositKey, price: PriceSnapshot) -> StoreResult<bool>;

    /// All deposits, ordered by key
    async fn list_deposits(&self) -> StoreResult<Vec<Deposit>>;

    /// Park a fill whose deposit has not been seen yet
    async fn park_fill(&self, fill: FillRecord) -> StoreResult<()>;

    /// Remove and return parked fills for a deposit, in arrival order
    async fn take_parked_fills(&self, key: &DepositKey) -> StoreResult<Vec<FillRecord>>;

    /// Sticky referral address of a depositor
    async fn sticky_referral(&self, depositor: &Address) -> StoreResult<Option<Address>>;

    /// Set the sticky referral address of a depositor if none is set.
    /// Returns the address in force afterwards.
    async fn set_sticky_referral_if_absent(
        &self,
        depositor: &Address,
        referral: &Address,
    ) -> StoreResult<Address>;
}

/// Token metadata repository trait
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert or replace token metadata
    async fn upsert_token(&self, token: Token) -> StoreResult<()>;

    /// Get token by (address, chain)
    async fn get_token(&self, address: &Address, chain_id: ChainId) -> StoreResult<Option<Token>>;
}

/// Historic market price repository trait
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// Insert a daily price. Returns `false` when (symbol, date) already
    /// has a price; existing rows are never replaced.
    async fn insert_price(&self, price: HistoricMarketPrice) -> StoreResult<bool>;

    /// Get the price of a symbol on a calendar day
    async fn get_price(&self, symbol: &str, date: NaiveDate) -> StoreResult<Option<HistoricMarketPrice>>;
}

/// Pool rebalance route repository trait
#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Insert or update the destination token for (l1Token, destinationChainId)
    async fn upsert_route(&self, route: PoolRebalanceRoute) -> StoreResult<()>;

    /// Destination token for (l1Token, destinationChainId)
    async fn resolve_route(
        &self,
        l1_token: &Address,
        destination_chain_id: ChainId,
    ) -> StoreResult<Option<Address>>;
}

/// Relayer refund repository trait
#[async_trait]
pub trait RefundRepository: Send + Sync {
    /// Insert a refund. Returns `false` when its event key was already stored.
    async fn insert_refund(&self, refund: Refund) -> StoreResult<bool>;

    /// Refunds paid to a relayer
    async fn refunds_for_relayer(&self, relayer: &Address) -> StoreResult<Vec<Refund>>;
}
