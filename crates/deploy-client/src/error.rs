//! Error types for deploy-client

use thiserror::Error;

/// Errors returned by the Deployments API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx response
    #[error("deployment API returned {status_code}: {body}")]
    Status { status_code: u16, body: String },

    /// Connection, TLS or timeout failure before a response arrived
    #[error("deployment API transport error: {0}")]
    Transport(String),

    /// 2xx response carrying a malformed JSON document
    #[error("deployment API response could not be decoded: {0}")]
    Decode(String),

    /// Base URL could not be joined with the request path
    #[error("invalid deployment API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status code, when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Result type for Deployments API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;
