//! Error types for stack-state

use thiserror::Error;

/// Errors that can occur while talking to the stack backend
#[derive(Error, Debug)]
pub enum StackError {
    /// A stack with this qualified name already exists
    #[error("stack already exists: {stack}")]
    AlreadyExists { stack: String },

    /// No stack with this qualified name exists
    #[error("stack not found: {stack}")]
    NotFound { stack: String },

    /// Qualified name did not have the `org/project/name` shape
    #[error("invalid stack name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Any other backend failure (config write, refresh, listing)
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend command exceeded its time budget
    #[error("backend command timed out after {secs}s: {command}")]
    Timeout { command: String, secs: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StackError {
    /// Whether this error means the stack name is already taken.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StackError::AlreadyExists { .. })
    }

    /// Whether this error means the stack could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StackError::NotFound { .. })
    }
}
