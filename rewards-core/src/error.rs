//! Rewards Error Codes Registry
//!
//! Error code format: RW-{module}-{sequence}
//! - RW-FEE: Fixed-point parsing and fee arithmetic
//! - RW-ID: Address / hash / identifier parsing
//! - RW-DEPOSIT: Deposit lifecycle violations
//! - RW-PRICE: Missing or invalid price snapshots
//! - RW-SCHED: Versioned schedule (tiers, multipliers) errors
//! - RW-JOB: Rewards-window job errors
//! - RW-MERKLE: Merkle tree and proof errors

use thiserror::Error;

/// Rewards Result type
pub type RewardsResult<T> = Result<T, RewardsError>;

/// Coarse classification used by callers to decide between rejecting a
/// request synchronously and failing an in-flight job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any state transition
    Configuration,
    /// Aborts the in-flight job, rolls back all writes
    DataIntegrity,
    /// Anything else
    Internal,
}

/// Rewards Error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardsError {
    // ============================================================
    // Fee Errors (RW-FEE-*)
    // ============================================================
    /// [RW-FEE-001] Value is not a valid fixed-point number
    #[error("[RW-FEE-001] Invalid fixed-point value for {field}: {value:?}")]
    InvalidFixedPoint { field: String, value: String },

    /// [RW-FEE-002] Integer amount expected
    #[error("[RW-FEE-002] Expected an integer amount for {field}, got {value}")]
    NonIntegerAmount { field: String, value: String },

    // ============================================================
    // Identifier Errors (RW-ID-*)
    // ============================================================
    /// [RW-ID-001] Invalid EVM address
    #[error("[RW-ID-001] Invalid address: {value:?}")]
    InvalidAddress { value: String },

    /// [RW-ID-002] Invalid 32-byte hash
    #[error("[RW-ID-002] Invalid 32-byte hash: {value:?}")]
    InvalidHash { value: String },

    // ============================================================
    // Deposit Errors (RW-DEPOSIT-*)
    // ============================================================
    /// [RW-DEPOSIT-001] Invalid status transition
    #[error("[RW-DEPOSIT-001] Invalid deposit status transition for {deposit}: {from} -> {to}")]
    InvalidDepositTransition {
        deposit: String,
        from: String,
        to: String,
    },

    /// [RW-DEPOSIT-002] Deposit already assigned to a window
    #[error("[RW-DEPOSIT-002] Deposit {deposit} already assigned to {rewards_type} window {window_index}")]
    WindowAlreadyAssigned {
        deposit: String,
        rewards_type: String,
        window_index: u64,
    },

    /// [RW-DEPOSIT-003] Deposit must be filled
    #[error("[RW-DEPOSIT-003] Deposit {deposit} is not filled")]
    DepositNotFilled { deposit: String },

    /// [RW-DEPOSIT-004] Sticky referral address is immutable
    #[error("[RW-DEPOSIT-004] Sticky referral for {depositor} already set to {current}")]
    StickyReferralImmutable { depositor: String, current: String },

    // ============================================================
    // Price Errors (RW-PRICE-*)
    // ============================================================
    /// [RW-PRICE-001] Missing or unusable USD price for a consumed deposit
    #[error("[RW-PRICE-001] Missing {what} USD price for deposit {deposit}")]
    MissingPrice { deposit: String, what: String },

    // ============================================================
    // Schedule Errors (RW-SCHED-*)
    // ============================================================
    /// [RW-SCHED-001] Schedule versions are append-only
    #[error("[RW-SCHED-001] Schedule version {version_id} rejected: {reason}")]
    ScheduleNotAppendOnly { version_id: String, reason: String },

    /// [RW-SCHED-002] No version effective at the given time
    #[error("[RW-SCHED-002] No schedule version effective at {at}")]
    NoEffectiveVersion { at: String },

    /// [RW-SCHED-003] Content digest mismatch
    #[error("[RW-SCHED-003] Schedule version {version_id} digest mismatch")]
    ScheduleDigestMismatch { version_id: String },

    /// [RW-SCHED-004] Rate table is not well-formed
    #[error("[RW-SCHED-004] Invalid rate table: {reason}")]
    InvalidRateTable { reason: String },

    // ============================================================
    // Job Errors (RW-JOB-*)
    // ============================================================
    /// [RW-JOB-001] Invalid job configuration
    #[error("[RW-JOB-001] Invalid job configuration: {reason}")]
    InvalidJobConfig { reason: String },

    /// [RW-JOB-002] Window index already used on this distribution line
    #[error("[RW-JOB-002] Window {window_index} already exists for chain {chain_id} contract {contract}")]
    WindowIndexCollision {
        chain_id: u64,
        contract: String,
        window_index: u64,
    },

    /// [RW-JOB-003] Invalid job status transition
    #[error("[RW-JOB-003] Invalid job status transition: {from} -> {to}")]
    InvalidJobTransition { from: String, to: String },

    /// [RW-JOB-004] Address appears twice in one window
    #[error("[RW-JOB-004] Duplicate recipient {address} in window")]
    DuplicateRecipient { address: String },

    /// [RW-JOB-005] Aggregate reward is negative
    #[error("[RW-JOB-005] Negative aggregate {amount} for recipient {address}")]
    NegativeAggregate { address: String, amount: String },

    /// [RW-JOB-006] Nothing to distribute
    #[error("[RW-JOB-006] Window has no eligible recipients")]
    EmptyWindow,

    // ============================================================
    // Merkle Errors (RW-MERKLE-*)
    // ============================================================
    /// [RW-MERKLE-001] Amount does not fit a uint256 leaf
    #[error("[RW-MERKLE-001] Amount {value} cannot be encoded as uint256")]
    AmountOutOfRange { value: String },

    /// [RW-MERKLE-002] Leaf index out of bounds
    #[error("[RW-MERKLE-002] Leaf index {index} out of bounds ({leaf_count} leaves)")]
    LeafIndexOutOfBounds { index: usize, leaf_count: usize },

    // ============================================================
    // General Errors
    // ============================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invariant violation
    #[error("Invariant violation: {invariant} - {details}")]
    InvariantViolation { invariant: String, details: String },
}

impl RewardsError {
    /// Create an invalid fixed-point error
    pub fn invalid_fixed_point(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidFixedPoint {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an invalid job config error
    pub fn invalid_job_config(reason: impl Into<String>) -> Self {
        Self::InvalidJobConfig {
            reason: reason.into(),
        }
    }

    /// Create an invariant violation
    pub fn invariant(invariant: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvariantViolation {
            invariant: invariant.into(),
            details: details.into(),
        }
    }

    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            RewardsError::InvalidJobConfig { .. }
            | RewardsError::WindowIndexCollision { .. }
            | RewardsError::InvalidJobTransition { .. }
            | RewardsError::ScheduleNotAppendOnly { .. }
            | RewardsError::NoEffectiveVersion { .. }
            | RewardsError::ScheduleDigestMismatch { .. }
            | RewardsError::InvalidRateTable { .. } => ErrorCategory::Configuration,
            RewardsError::InvalidFixedPoint { .. }
            | RewardsError::NonIntegerAmount { .. }
            | RewardsError::InvalidAddress { .. }
            | RewardsError::InvalidHash { .. }
            | RewardsError::InvalidDepositTransition { .. }
            | RewardsError::WindowAlreadyAssigned { .. }
            | RewardsError::DepositNotFilled { .. }
            | RewardsError::StickyReferralImmutable { .. }
            | RewardsError::MissingPrice { .. }
            | RewardsError::DuplicateRecipient { .. }
            | RewardsError::NegativeAggregate { .. }
            | RewardsError::EmptyWindow
            | RewardsError::AmountOutOfRange { .. }
            | RewardsError::InvariantViolation { .. } => ErrorCategory::DataIntegrity,
            RewardsError::LeafIndexOutOfBounds { .. } | RewardsError::SerializationError(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

impl From<serde_json::Error> for RewardsError {
    fn from(err: serde_json::Error) -> Self {
        RewardsError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let err = RewardsError::WindowIndexCollision {
            chain_id: 10,
            contract: "0xabc".to_string(),
            window_index: 3,
        };
        assert!(err.to_string().starts_with("[RW-JOB-002]"));

        let err = RewardsError::EmptyWindow;
        assert!(err.to_string().contains("RW-JOB-006"));
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            RewardsError::invalid_job_config("missing cutoff").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            RewardsError::DuplicateRecipient {
                address: "0x01".to_string()
            }
            .category(),
            ErrorCategory::DataIntegrity
        );
        assert_eq!(
            RewardsError::SerializationError("x".to_string()).category(),
            ErrorCategory::Internal
        );
    }
}
