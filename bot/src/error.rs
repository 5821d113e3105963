//! Error types for the bot application layer.

use lakeside_runtime::StoreError;
use thiserror::Error;

/// Errors from routing an inbound event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// The conversation runtime refused the action
    #[error("Conversation runtime error: {0}")]
    Session(#[from] StoreError),

    /// The task running the unit of work panicked or was cancelled
    #[error("Unit of work aborted: {0}")]
    Aborted(String),
}

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;
