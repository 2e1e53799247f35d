//! Message types for agent conversations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions).
    System,
    /// Human operator message.
    User,
    /// Assistant (reasoning backend) message.
    Assistant,
    /// Tool result message.
    Tool,
}

/// A structured request from the backend to invoke a named capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, echoed back on the paired result.
    pub id: String,
    /// Name of the capability to invoke.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: Value,
}

/// The outcome of executing one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultRecord {
    /// Id of the call this result answers.
    pub call_id: String,
    /// Captured output text.
    pub output: String,
    /// Error description, if the tool itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResultRecord {
    /// Result of a successful invocation.
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            error: None,
        }
    }

    /// Result carrying an error description as tool output.
    pub fn err(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            call_id: call_id.into(),
            output: error.clone(),
            error: Some(error),
        }
    }
}

/// A message in a conversation. Immutable once appended to a
/// transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Tool invocations proposed by the assistant, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool messages, the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a new assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message that proposes tool calls.
    pub fn assistant_with_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message from a result record.
    pub fn tool_result(result: &ToolResultRecord) -> Self {
        Self {
            role: Role::Tool,
            content: result.output.clone(),
            tool_calls: Vec::new(),
            tool_call_id: Some(result.call_id.clone()),
        }
    }

    /// Check whether this message proposes at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
