//! Reasoning backend abstraction for redscout.
//!
//! This crate provides a unified interface for asking a completion
//! backend what the agent should do next:
//! - Google (Gemini)
//! - OpenAI
//! - Local models served through an OpenAI-compatible endpoint
//!   (llama.cpp server)

pub mod error;
pub mod message;

pub mod google;
pub mod local;
pub mod openai;

// Testing provider, also used by downstream crate tests.
pub mod mock;

pub use error::{ProviderError, ProviderResult};
pub use message::{Message, Role, ToolCall, ToolResultRecord};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A capability advertised to the reasoning backend.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Natural-language description grounding the backend's choice.
    pub description: String,
    /// JSON Schema for the tool arguments.
    pub parameters: Value,
}

/// The closed set of supported reasoning backends.
///
/// An unrecognized selection fails at configuration load, before any
/// sandbox exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google Gemini API.
    Google,
    /// OpenAI chat completions API.
    OpenAi,
    /// Local model behind an OpenAI-compatible server.
    Local,
}

/// The main trait for reasoning backends.
///
/// One call produces the next message of the conversation; any tool
/// invocations the backend wants are carried on the returned message.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Ask the backend for the next message given the transcript and
    /// the available capabilities.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ProviderResult<Message>;

    /// Get the model identifier (e.g. "gemini-2.0-flash").
    fn model_id(&self) -> &str;

    /// Get the provider ID (e.g. "google", "openai", "local").
    fn provider_id(&self) -> &str;
}

/// A boxed language model for dynamic dispatch.
pub type BoxedLanguageModel = Arc<dyn LanguageModel>;
