//! Error types for the core crate.

use thiserror::Error;

/// Core error types.
///
/// Tool validation failures never appear here: they are returned to
/// the reasoning backend as tool output and the loop continues. What
/// does appear is fatal for the run.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error, raised before any sandbox exists.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Sandbox lifecycle failure (create or execute).
    #[error("sandbox error: {0}")]
    Sandbox(#[from] redscout_sandbox::SandboxError),

    /// Reasoning backend failure. No orchestrator-level retry.
    #[error("reasoning backend error: {0}")]
    Provider(#[from] redscout_provider::ProviderError),

    /// Non-recoverable tool failure.
    #[error("tool error: {0}")]
    Tool(redscout_tools::ToolError),

    /// Operator aborted the run at the review gate.
    #[error("run aborted by operator")]
    HumanAbort,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid TOML syntax or an unsupported value, such as an
    /// unrecognized backend selection.
    #[error("invalid config at {path}: {message}")]
    Invalid { path: String, message: String },

    /// Config file not found.
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// Config validation failed.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// The local backend was selected without a model path.
    #[error("backend 'local' requires a model path (agent.local_model_path)")]
    MissingModelPath,
}

impl ConfigError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
