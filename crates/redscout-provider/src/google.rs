//! Google Gemini provider implementation.
//!
//! Implements the Google Generative AI `generateContent` API.

use crate::{
    error::ProviderError,
    message::{Message, Role, ToolCall},
    LanguageModel, ProviderResult, ToolDescriptor,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider.
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GoogleProvider {
    /// Create a new Google provider.
    pub fn new(api_key: &str, model: &str) -> ProviderResult<Self> {
        if api_key.is_empty() {
            return Err(ProviderError::missing_api_key("google"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        )
    }

    /// Convert our messages to Gemini format.
    ///
    /// System messages are lifted into `systemInstruction` by the
    /// caller. Gemini wants tool results as `functionResponse` parts
    /// named after the declared function, and this provider's call ids
    /// are synthetic, so ids are mapped back to the tool names of the
    /// assistant turn that proposed them.
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        let mut result = Vec::new();
        let mut call_names: HashMap<&str, &str> = HashMap::new();

        for msg in messages {
            match msg.role {
                Role::System => continue,
                Role::User => result.push(json!({
                    "role": "user",
                    "parts": [{"text": msg.content}]
                })),
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(json!({"text": msg.content}));
                    }
                    for call in &msg.tool_calls {
                        call_names.insert(call.id.as_str(), call.name.as_str());
                        parts.push(json!({
                            "functionCall": {
                                "name": call.name,
                                "args": call.arguments
                            }
                        }));
                    }
                    if !parts.is_empty() {
                        result.push(json!({"role": "model", "parts": parts}));
                    }
                }
                Role::Tool => {
                    let name = msg
                        .tool_call_id
                        .as_deref()
                        .and_then(|id| call_names.get(id).copied())
                        .unwrap_or("tool");
                    result.push(json!({
                        "role": "function",
                        "parts": [{
                            "functionResponse": {
                                "name": name,
                                "response": {"content": msg.content}
                            }
                        }]
                    }));
                }
            }
        }

        result
    }

    /// Convert tool descriptors to Gemini function declarations.
    fn convert_tools(tools: &[ToolDescriptor]) -> Value {
        if tools.is_empty() {
            return Value::Null;
        }

        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters
                })
            })
            .collect();

        json!([{
            "functionDeclarations": function_declarations
        }])
    }
}

#[async_trait]
impl LanguageModel for GoogleProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> ProviderResult<Message> {
        let system: String = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut body = json!({
            "contents": Self::convert_messages(messages),
        });

        if !system.is_empty() {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        let converted = Self::convert_tools(tools);
        if !converted.is_null() {
            body["tools"] = converted;
        }

        debug!(model = %self.model, "Gemini request");

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Gemini error response");
            return Err(ProviderError::api_error(status.as_u16(), text));
        }

        let parsed: GeminiResponse = response.json().await?;
        let candidate = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response("no candidates in response"))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for part in candidate
            .content
            .and_then(|c| c.parts)
            .unwrap_or_default()
        {
            if let Some(text) = part.text {
                content.push_str(&text);
            }
            if let Some(fc) = part.function_call {
                // Gemini does not assign call ids; synthesize stable ones.
                let id = format!("call_{}", tool_calls.len());
                tool_calls.push(ToolCall {
                    id,
                    name: fc.name,
                    arguments: fc.args.unwrap_or_else(|| json!({})),
                });
            }
        }

        Ok(Message::assistant_with_calls(content, tool_calls))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn provider_id(&self) -> &str {
        "google"
    }
}

/// Gemini response structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}
