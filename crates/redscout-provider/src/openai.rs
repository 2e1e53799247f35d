//! OpenAI chat completions provider.
//!
//! Also serves as the wire format for OpenAI-compatible servers (see
//! the `local` module).

use crate::{
    error::ProviderError,
    message::{Message, Role, ToolCall},
    LanguageModel, ProviderResult, ToolDescriptor,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

const API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    provider_id: &'static str,
}

impl OpenAiProvider {
    /// Create a provider against api.openai.com.
    pub fn new(api_key: &str, model: &str) -> ProviderResult<Self> {
        if api_key.is_empty() {
            return Err(ProviderError::missing_api_key("openai"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.to_string()),
            base_url: API_BASE.to_string(),
            model: model.to_string(),
            provider_id: "openai",
        })
    }

    /// Create a provider against an OpenAI-compatible server that
    /// needs no API key (local llama.cpp server).
    pub fn compatible(base_url: &str, model: &str, provider_id: &'static str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            provider_id,
        }
    }

    /// Convert our messages to the chat completions wire format.
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| match msg.role {
                Role::System => json!({"role": "system", "content": msg.content}),
                Role::User => json!({"role": "user", "content": msg.content}),
                Role::Assistant => {
                    let mut m = json!({"role": "assistant", "content": msg.content});
                    if msg.has_tool_calls() {
                        m["tool_calls"] = msg
                            .tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        // OpenAI carries arguments as a JSON string
                                        "arguments": call.arguments.to_string()
                                    }
                                })
                            })
                            .collect();
                    }
                    m
                }
                Role::Tool => json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id,
                    "content": msg.content
                }),
            })
            .collect()
    }

    /// Convert tool descriptors to OpenAI function tools.
    fn convert_tools(tools: &[ToolDescriptor]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters
                    }
                })
            })
            .collect()
    }
}

#[async_trait]
impl LanguageModel for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ProviderResult<Message> {
        let mut body = json!({
            "model": self.model,
            "messages": Self::convert_messages(messages),
        });

        if !tools.is_empty() {
            body["tools"] = Value::Array(Self::convert_tools(tools));
        }

        debug!(model = %self.model, provider = self.provider_id, "chat completions request");

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, provider = self.provider_id, "chat completions error");
            return Err(ProviderError::api_error(status.as_u16(), text));
        }

        let parsed: ChatResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response("no choices in response"))?;

        let mut tool_calls = Vec::new();
        for (idx, call) in choice.message.tool_calls.unwrap_or_default().into_iter().enumerate() {
            let arguments: Value = serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| json!({}));
            tool_calls.push(ToolCall {
                id: call.id.unwrap_or_else(|| format!("call_{}", idx)),
                name: call.function.name,
                arguments,
            });
        }

        Ok(Message::assistant_with_calls(
            choice.message.content.unwrap_or_default(),
            tool_calls,
        ))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn provider_id(&self) -> &str {
        self.provider_id
    }
}

/// Chat completions response structure.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_messages() {
        let record = crate::ToolResultRecord::ok("call_9", "done");
        let messages = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call_9".to_string(),
                    name: "shell".to_string(),
                    arguments: json!({"command": "id"}),
                }],
            ),
            Message::tool_result(&record),
        ];
        let converted = OpenAiProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[2]["tool_calls"][0]["function"]["name"], "shell");
        // Arguments are carried as a JSON string on the wire.
        assert!(converted[2]["tool_calls"][0]["function"]["arguments"].is_string());
        assert_eq!(converted[3]["tool_call_id"], "call_9");
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            OpenAiProvider::new("", "gpt-4o"),
            Err(ProviderError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_compatible_trims_slash() {
        let provider = OpenAiProvider::compatible("http://127.0.0.1:8080/v1/", "local", "local");
        assert_eq!(provider.base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(provider.provider_id(), "local");
    }
}
