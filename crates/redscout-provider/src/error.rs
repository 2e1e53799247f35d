//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to a reasoning backend.
///
/// All of these are fatal for the current run: the orchestrator tears
/// the sandbox down and propagates them without retrying.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered but the payload was not usable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Missing API key.
    #[error("missing API key for provider: {0}")]
    MissingApiKey(String),

    /// API error with status code.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal provider error.
    #[error("provider error: {message}")]
    Internal { message: String },
}

impl ProviderError {
    /// Create a missing API key error.
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey(provider.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Create an API error.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
