//! Error taxonomy shared by the automation engines.
//!
//! Synchronous trigger entry points surface these to the caller unchanged;
//! the scheduled jobs catch per-item errors, log them, and keep going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A tenant-scoped entity referenced by id does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A rule or request is malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An action was requested against inconsistent state.
    #[error("invalid state: {0}")]
    State(String),

    /// The repository backing the engines is unavailable.
    #[error("store error: {0}")]
    Store(String),
}

impl AppError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
