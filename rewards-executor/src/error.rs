//! Rewards Executor Error Types

use rewards_core::{ErrorCategory, RewardsError};
use thiserror::Error;

/// Executor Result type
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Executor Error
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Invalid executor configuration
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// Domain error from the core
    #[error("{0}")]
    Core(RewardsError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job exceeded its execution timeout
    #[error("Job {job_id} timed out after {timeout_secs}s")]
    JobTimeout { job_id: String, timeout_secs: u64 },

    /// Not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExecutorError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Rejected before any state transition
    pub fn is_configuration(&self) -> bool {
        match self {
            ExecutorError::Configuration { .. } => true,
            ExecutorError::Core(err) => err.category() == ErrorCategory::Configuration,
            _ => false,
        }
    }
}

impl From<RewardsError> for ExecutorError {
    fn from(err: RewardsError) -> Self {
        Self::Core(err)
    }
}

impl From<rewards_store::StoreError> for ExecutorError {
    fn from(err: rewards_store::StoreError) -> Self {
        match err {
            rewards_store::StoreError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            other => Self::Storage(other.to_string()),
        }
    }
}
