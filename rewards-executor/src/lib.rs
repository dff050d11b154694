//! Bridge Rewards Executor - Ingestion, Pricing and Window Jobs
//!
//! Orchestrates the rewards pipeline on top of `rewards-core` and any
//! [`LedgerStore`](rewards_store::LedgerStore).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  Rewards Executor                    │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │EventIngestor │─►│DepositPricer │─►│WindowJobs  │  │
//! │  │ reconcile    │  │ USD snapshot │  │ tree+commit│  │
//! │  └──────┬───────┘  └──────────────┘  └─────▲──────┘  │
//! │         │                                  │         │
//! │         ▼                                  │         │
//! │  ┌──────────────┐     claimed windows      │         │
//! │  │ ClaimTracker │──────────────────────────┘         │
//! │  └──────────────┘                                    │
//! └──────────────────────────────────────────────────────┘
//!            │                 │                │
//!            ▼                 ▼                ▼
//!      rewards-store      rewards-core     rewards-core
//! ```
//!
//! # Modules
//!
//! - [`ingest`] - Event ingestion and deposit/fill reconciliation
//! - [`pricing`] - Deposit USD price snapshots
//! - [`job`] - Rewards-window job state machine
//! - [`claims`] - Claim tracking and queries
//! - [`config`] - Executor configuration
//! - [`error`] - Error types
//!
//! # Usage Example
//!
//! ```ignore
//! use rewards_executor::{ExecutorConfig, RewardsWindowExecutor};
//! use rewards_core::{JobConfig, RewardsType};
//! use rewards_store::InMemoryLedger;
//! use std::sync::Arc;
//!
//! async fn example(cutoff: chrono::DateTime<chrono::Utc>) {
//!     let store = Arc::new(InMemoryLedger::new());
//!     let executor = RewardsWindowExecutor::new(store, ExecutorConfig::default()).unwrap();
//!
//!     let report = executor
//!         .execute(0, JobConfig::new(cutoff, RewardsType::Referral))
//!         .await
//!         .unwrap();
//!     println!("{} {:?}", report.status, report.merkle_root);
//! }
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod ingest;
pub mod job;
pub mod pricing;

pub use claims::{ClaimTracker, RecipientClaimStatus};
pub use config::{ExecutorConfig, DEFAULT_LP_FEE_CAP};
pub use error::{ExecutorError, ExecutorResult};
pub use ingest::{ChainEvent, EventIngestor, IngestOutcome, IngestSummary};
pub use job::RewardsWindowExecutor;
pub use pricing::{DepositPricer, PricingGap, PricingReport};

// Re-export common types from rewards-core
pub use rewards_core::{JobConfig, JobReport, JobStatus, RewardsType};
