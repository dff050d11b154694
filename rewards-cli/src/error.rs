//! CLI Error Types

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Executor error
    #[error("Executor error: {0}")]
    ExecutorError(#[from] rewards_executor::ExecutorError),

    /// Store error
    #[error("Store error: {0}")]
    StoreError(#[from] rewards_store::StoreError),

    /// Core error
    #[error("Core error: {0}")]
    CoreError(#[from] rewards_core::RewardsError),

    /// The job ran and ended in `Failed`
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// One or more proofs do not match the window root
    #[error("{failed} of {total} proofs do not match the window root")]
    VerificationFailed { failed: usize, total: usize },

    /// A built-in schedule version no longer matches its digest
    #[error("{failed} of {total} schedule versions do not match their digest")]
    ScheduleDigestMismatch { failed: usize, total: usize },
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::IoError(_) => 5,
            CliError::JsonError(_) => 6,
            CliError::ExecutorError(e) if e.is_configuration() => 1,
            CliError::ExecutorError(_) => 10,
            CliError::StoreError(_) => 11,
            CliError::CoreError(_) => 12,
            CliError::JobFailed { .. } => 20,
            CliError::VerificationFailed { .. } => 21,
            CliError::ScheduleDigestMismatch { .. } => 22,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("REWARDS_CONTRACT_ADDRESS is not an address");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("REWARDS_CONTRACT_ADDRESS"));
    }

    #[test]
    fn test_executor_configuration_maps_to_config_exit() {
        let err = CliError::from(rewards_executor::ExecutorError::configuration("bad cutoff"));
        assert_eq!(err.exit_code(), 1);

        let err = CliError::from(rewards_executor::ExecutorError::Storage("down".to_string()));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_verification_failed() {
        let err = CliError::VerificationFailed { failed: 1, total: 4 };
        assert_eq!(err.exit_code(), 21);
        assert!(err.to_string().contains("1 of 4"));

        let err = CliError::ScheduleDigestMismatch { failed: 1, total: 2 };
        assert_eq!(err.exit_code(), 22);
    }
}
