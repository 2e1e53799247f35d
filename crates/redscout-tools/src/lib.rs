//! Capability registry and built-in tools for redscout.
//!
//! The reasoning backend sees a closed set of named capabilities.
//! Every capability validates its arguments before touching the
//! sandbox, and no tool ever executes outside it: the safety boundary
//! is the sandbox's privilege envelope, not command-string filtering.

pub mod error;
pub mod registry;

// Tool implementations
pub mod http;
pub mod install;
pub mod python;
pub mod scan;
pub mod shell;

pub use error::{ToolError, ToolResult};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use redscout_sandbox::SandboxRuntime;

/// Context provided to tools during execution.
pub struct ToolContext {
    /// Session ID.
    pub session_id: String,
    /// The sandbox every capability delegates to.
    pub sandbox: Arc<dyn SandboxRuntime>,
}

/// The main trait for tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name.
    fn name(&self) -> &str;

    /// Get the tool description (grounding for the backend's prompt).
    fn description(&self) -> &str;

    /// Get the JSON Schema for the tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool inside the sandbox.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult<String>;
}

/// A boxed tool for dynamic dispatch.
pub type BoxedTool = Arc<dyn Tool>;

/// Deserialize tool arguments into a typed struct, turning serde
/// failures into descriptive validation errors.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    serde_json::from_value(args).map_err(|e| ToolError::validation(format!("invalid arguments: {}", e)))
}

/// Normalize empty or whitespace-only command output into an explicit
/// "no response" message, distinct from a valid empty body.
pub(crate) fn normalize_output(output: String, subject: &str) -> String {
    if output.trim().is_empty() {
        format!("No response from {}. Host may be unreachable.", subject)
    } else {
        output
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_output_empty() {
        let normalized = normalize_output("  \n\t".to_string(), "http://example.com");
        assert_eq!(
            normalized,
            "No response from http://example.com. Host may be unreachable."
        );
    }

    #[test]
    fn test_normalize_output_passthrough() {
        assert_eq!(
            normalize_output("<html></html>".to_string(), "x"),
            "<html></html>"
        );
    }
}
