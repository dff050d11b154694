//! Rewards Store Repositories
//!
//! Data access layer for the rewards ledger.

mod ledger_repo;
mod window_repo;

// In-memory implementation
mod memory;

pub use ledger_repo::*;
pub use window_repo::*;

pub use memory::InMemoryLedger;

/// Every repository the pipeline needs, behind one handle
pub trait LedgerStore:
    EventLogRepository
    + DepositRepository
    + TokenRepository
    + PriceRepository
    + RouteRepository
    + RefundRepository
    + ClaimRepository
    + WindowRepository
    + JobRepository
    + SnapshotSource
{
}

impl<T> LedgerStore for T where
    T: EventLogRepository
        + DepositRepository
        + TokenRepository
        + PriceRepository
        + RouteRepository
        + RefundRepository
        + ClaimRepository
        + WindowRepository
        + JobRepository
        + SnapshotSource
{
}
