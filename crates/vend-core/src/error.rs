//! Error taxonomy for account vending outside the workflow itself.
//!
//! Step failures inside a workflow are never raised; they are recorded in
//! the `OutcomeReport`. These errors cover configuration, input parsing and
//! the read-only listing path.

use stack_state::StackError;

/// Account vending errors.
#[derive(Debug, thiserror::Error)]
pub enum VendError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid account request: {0}")]
    InvalidRequest(String),

    #[error("stack backend error: {0}")]
    Stack(#[from] StackError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for account vending operations.
pub type Result<T> = std::result::Result<T, VendError>;
