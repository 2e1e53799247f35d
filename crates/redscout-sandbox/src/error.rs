//! Error types for sandbox operations.

use thiserror::Error;

/// Errors that can occur during sandbox lifecycle operations.
///
/// Create and execute failures abort the run; destroy failures are
/// logged by the runtime and never surface past the teardown path.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Failed to connect to the Docker daemon.
    #[error("failed to connect to Docker daemon: {0}")]
    ConnectionFailed(String),

    /// Failed to pull the base image.
    #[error("failed to pull image '{image}': {message}")]
    ImagePullFailed { image: String, message: String },

    /// Failed to create the container.
    #[error("failed to create container: {0}")]
    CreateFailed(String),

    /// Failed to start the container.
    #[error("failed to start container: {0}")]
    StartFailed(String),

    /// Sandbox is not running.
    #[error("sandbox is not running")]
    NotRunning,

    /// Sandbox already has a live container for this session.
    #[error("sandbox is already running")]
    AlreadyRunning,

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecFailed(String),
}

impl SandboxError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create an image pull failed error.
    pub fn image_pull_failed(image: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImagePullFailed {
            image: image.into(),
            message: message.into(),
        }
    }

    /// Create a container create failed error.
    pub fn create_failed(message: impl Into<String>) -> Self {
        Self::CreateFailed(message.into())
    }

    /// Create an exec failed error.
    pub fn exec_failed(message: impl Into<String>) -> Self {
        Self::ExecFailed(message.into())
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;
