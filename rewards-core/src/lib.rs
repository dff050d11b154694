//! Bridge Rewards Core - Fee Arithmetic, Eligibility and Distribution Trees
//!
//! The domain layer of the rewards back office:
//! - **Fees**: exact fixed-point decomposition of on-chain wei-percentages
//! - **Ledger model**: deposits, fills, claims and their lifecycles
//! - **Eligibility**: explicit deposit states and named filter predicates
//! - **Rates**: versioned referral tier tables and date-keyed multipliers
//! - **Distribution**: per-recipient aggregation and Merkle distributor trees
//!
//! # Invariants
//!
//! | Invariant | Requirement |
//! |-----------|-------------|
//! | **Exact arithmetic** | No floating point on amounts, percentages or USD values |
//! | **Append-only rates** | Tier and multiplier versions are never edited in place |
//! | **Deterministic trees** | Same totals always give the same root and proofs |
//! | **Single payout** | A deposit joins at most one window per rewards type |
//!
//! # Core Types
//!
//! - [`Deposit`]: one bridge transfer, pending -> filled
//! - [`DepositState`]: `Unfilled | Unpriced | Priced | WindowAssigned`
//! - [`ReferralVolumeIndex`]: referral performance as of any date
//! - [`WindowTree`]: recipients with account indices and proofs
//! - [`RewardsWindowJob`]: one distribution cycle

pub mod eligibility;
pub mod error;
pub mod fee;
pub mod merkle;
pub mod multiplier;
pub mod referral;
pub mod rewards;
pub mod schedule;
pub mod types;

pub use error::{ErrorCategory, RewardsError, RewardsResult};

pub use types::*;

pub use eligibility::{DepositState, PricedDeposit};

pub use fee::{compute_pct_values, split_relayer_fee, FormattedPctValues, FormattedRelayerFeeSplit, PctValues, RelayerFeeSplit};

pub use merkle::{build_window_tree, MerkleLeaf, MerkleTreeBuilder, WindowLeaf, WindowTree};

pub use multiplier::{MultiplierSchedule, MultiplierTable};

pub use referral::{ReferralTier, ReferralVolumeIndex, ReferralVolumeSnapshot, TierSchedule, TierTable};

pub use rewards::{DepositReward, RecipientAggregator, RecipientBreakdown, RecipientTotal, RewardContext};

pub use schedule::{ScheduleVersion, VersionedSchedule};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
