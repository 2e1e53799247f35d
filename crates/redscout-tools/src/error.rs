//! Tool error types.

use thiserror::Error;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur during tool execution.
///
/// `Validation` is recoverable: the orchestrator feeds it back to the
/// reasoning backend as tool output. `Sandbox` failures abort the run.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Malformed or missing arguments.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sandbox-level failure while executing the capability.
    #[error("sandbox error: {0}")]
    Sandbox(#[from] redscout_sandbox::SandboxError),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this error should be fed back to the reasoning
    /// backend rather than aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Json(_))
    }
}
