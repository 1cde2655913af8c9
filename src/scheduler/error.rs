//! Error types for the scheduler module

use crate::error::AppError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Failed to start scheduler: {0}")]
    StartupFailed(String),

    #[error("Failed to shutdown scheduler: {0}")]
    ShutdownFailed(String),

    /// Cron expression rejected or job could not be registered
    #[error("Failed to create job: {0}")]
    JobCreationFailed(String),
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::JobCreationFailed(msg) => AppError::Configuration(msg),
            _ => AppError::Internal(err.to_string()),
        }
    }
}
