//! Rewards Core Type Definitions
//!
//! All types follow these naming conventions:
//! - snake_case for field names, camelCase on the wire
//! - fixed-point on-chain values are carried as decimal strings

pub mod claim;
pub mod common;
pub mod deposit;
pub mod events;
pub mod job;
pub mod market;
pub mod window;

pub use common::{Address, Bytes32, ChainId, DepositKey, EventKey, EventMeta, JobId, WindowIndex};

pub use deposit::{Deposit, DepositStatus, FeeBreakdown, FillOutcome, FillRecord, PriceSnapshot};

pub use events::{ClaimEvent, DepositEvent, FillEvent, PoolRebalanceRoute, Refund, SpeedUpEvent};

pub use claim::Claim;

pub use job::{JobConfig, JobReport, JobStatus, RewardsType, RewardsWindowJob};

pub use market::{HistoricMarketPrice, Token};

pub use window::{
    verify_recipient, DistributionLine, MerkleDistributorRecipient, MerkleDistributorWindow,
    RecipientArtifact, WindowArtifact,
};
