//! Rewards Store - Ledger Storage
//!
//! Repository traits for every ledger entity plus an in-memory
//! implementation. Natural keys are enforced as uniqueness constraints:
//!
//! | Entity | Key |
//! |--------|-----|
//! | Event log | (chainId, transactionHash, logIndex) |
//! | Deposit | (originChainId, depositId) |
//! | Price | (symbol, date) |
//! | Claim | (windowIndex, accountIndex) |
//! | Window | (chainId, contractAddress, windowIndex) |
//!
//! Window creation and deposit stamping go through
//! [`WindowRepository::commit_window`], which is all-or-nothing.

pub mod error;
pub mod repos;
pub mod snapshot;

pub use error::*;
pub use repos::*;
pub use snapshot::LedgerSnapshot;
