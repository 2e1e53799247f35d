//! Local model provider.
//!
//! Talks to a llama.cpp server (or any OpenAI-compatible endpoint)
//! running on the operator's machine. The model path is required
//! configuration: a missing path is a startup error, raised before any
//! sandbox exists.

use crate::{openai::OpenAiProvider, LanguageModel, Message, ProviderResult, ToolDescriptor};
use async_trait::async_trait;
use std::path::Path;

/// Default llama.cpp server endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/v1";

/// Provider for a locally served model.
pub struct LocalProvider {
    inner: OpenAiProvider,
    model_id: String,
}

impl LocalProvider {
    /// Create a local provider for the model at `model_path`, served
    /// at `endpoint`.
    pub fn new(model_path: &Path, endpoint: &str) -> Self {
        // The server ignores unknown model names; the file stem keeps
        // transcripts and logs attributable to the weights in use.
        let model_id = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("local-model")
            .to_string();

        Self {
            inner: OpenAiProvider::compatible(endpoint, &model_id, "local"),
            model_id,
        }
    }
}

#[async_trait]
impl LanguageModel for LocalProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ProviderResult<Message> {
        self.inner.complete(messages, tools).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider_id(&self) -> &str {
        "local"
    }
}
