//! Mock provider for testing.

use crate::{
    error::ProviderError,
    message::{Message, ToolCall},
    LanguageModel, ProviderResult, ToolDescriptor,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// A scripted response for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a text-only assistant message.
    Text(String),
    /// Return an assistant message carrying the given tool calls.
    ToolCalls(Vec<ToolCall>),
    /// Fail the call.
    Error(String),
}

/// Mock provider that replays scripted responses in order.
///
/// Once the script is exhausted it answers with a fixed text message,
/// so loops under test always terminate via their own predicates.
pub struct MockProvider {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty script.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a text response.
    pub fn expect_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::Text(text.into()));
    }

    /// Queue a single tool call response.
    pub fn expect_tool_call(&self, id: impl Into<String>, name: impl Into<String>, args: Value) {
        self.expect_tool_calls(vec![ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: args,
        }]);
    }

    /// Queue a multi-call response.
    pub fn expect_tool_calls(&self, calls: Vec<ToolCall>) {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::ToolCalls(calls));
    }

    /// Queue an error response.
    pub fn expect_error(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push(MockResponse::Error(message.into()));
    }

    /// Get the number of times `complete` was called.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockProvider {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolDescriptor],
    ) -> ProviderResult<Message> {
        *self.call_count.lock().unwrap() += 1;

        let response = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                MockResponse::Text("assessment complete".to_string())
            } else {
                responses.remove(0)
            }
        };

        match response {
            MockResponse::Text(text) => Ok(Message::assistant(text)),
            MockResponse::ToolCalls(calls) => Ok(Message::assistant_with_calls("", calls)),
            MockResponse::Error(message) => Err(ProviderError::internal(message)),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    fn provider_id(&self) -> &str {
        "mock"
    }
}
