//! Chat completion provider
//!
//! Defines the provider-agnostic conversation types plus the [`ChatProvider`]
//! trait the agent loop talks to, and an [`OllamaClient`] implementation
//! against Ollama's `/api/chat` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::ToolDefinition;
use crate::{Error, Result};

/// Default Ollama endpoint when neither config nor env override it
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Message role within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in an ordered conversation
///
/// Append-only within a single agent invocation; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Tool invocations requested by the assistant, echoed back verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Assistant message carrying requested tool invocations
    #[must_use]
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
        }
    }

    /// Tool-result message
    #[must_use]
    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Tool name as registered
    pub name: String,
    /// Argument mapping (string keys, loosely typed values)
    pub arguments: serde_json::Value,
}

/// Thinking-effort hint forwarded to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThinkingEffort {
    #[default]
    Off,
    Low,
    Medium,
    High,
}

impl ThinkingEffort {
    /// Parse from a config string; unknown values fall back to `Off`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Off,
        }
    }

    /// Wire value for Ollama's `think` field; `None` when off
    #[must_use]
    pub fn wire_value(self) -> Option<&'static str> {
        match self {
            Self::Off => None,
            Self::Low => Some("low"),
            Self::Medium => Some("medium"),
            Self::High => Some("high"),
        }
    }
}

/// A single chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Ordered conversation
    pub messages: Vec<ChatMessage>,
    /// Tool definitions offered this round; `None` disables tool calling
    pub tools: Option<Vec<ToolDefinition>>,
    /// Thinking-effort hint
    pub think: ThinkingEffort,
}

/// Provider response: free text and/or requested tool invocations
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Chat completion provider the agent loop talks to
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one request/response round
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Response shape of Ollama `/api/chat` (non-streaming)
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Chat completion client for a local Ollama server
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client against the given base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the `/api/chat` request body
    fn payload(request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            request.messages.iter().map(wire_message).collect();

        let mut payload = json!({
            "model": request.model,
            "messages": messages,
            "stream": false,
        });

        if let Some(tools) = &request.tools {
            payload["tools"] = json!(tools);
        }
        if let Some(think) = request.think.wire_value() {
            payload["think"] = json!(think);
        }

        payload
    }
}

/// Serialize one message in Ollama's wire shape
///
/// Tool calls nest under a `function` key with arguments as a JSON object.
fn wire_message(message: &ChatMessage) -> serde_json::Value {
    let mut value = json!({
        "role": message.role,
        "content": message.content,
    });

    if let Some(calls) = &message.tool_calls {
        value["tool_calls"] = serde_json::Value::Array(
            calls
                .iter()
                .map(|c| {
                    json!({
                        "function": {
                            "name": c.name,
                            "arguments": c.arguments,
                        }
                    })
                })
                .collect(),
        );
    }

    value
}

#[async_trait]
impl ChatProvider for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let endpoint = format!("{}/api/chat", self.base_url);
        let payload = Self::payload(request);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "sending chat request"
        );

        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, endpoint = %endpoint, "chat request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Chat(format!("Ollama API error {status}: {body}")));
        }

        let result: OllamaChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        let tool_calls = result
            .message
            .tool_calls
            .into_iter()
            .map(|c| ToolCallRequest {
                name: c.function.name,
                arguments: c.function.arguments,
            })
            .collect();

        Ok(ChatResponse {
            content: result.message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_message_plain() {
        let msg = ChatMessage::user("hello");
        let value = wire_message(&msg);
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn wire_message_nests_tool_calls_under_function() {
        let msg = ChatMessage::assistant_tool_calls(
            "",
            vec![ToolCallRequest {
                name: "get_current_datetime".to_string(),
                arguments: json!({}),
            }],
        );
        let value = wire_message(&msg);
        assert_eq!(
            value["tool_calls"][0]["function"]["name"],
            "get_current_datetime"
        );
    }

    #[test]
    fn parses_tool_call_response() {
        let body = r#"{
            "model": "gemma3:4b",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "schedule_reminder",
                                  "arguments": {"topic": "check oven", "minutes": 5}}}
                ]
            },
            "done": true
        }"#;
        let parsed: OllamaChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.tool_calls.len(), 1);
        assert_eq!(parsed.message.tool_calls[0].function.name, "schedule_reminder");
        assert_eq!(
            parsed.message.tool_calls[0].function.arguments["topic"],
            "check oven"
        );
    }

    #[test]
    fn parses_text_response_without_tool_calls() {
        let body = r#"{"message": {"role": "assistant", "content": "It is noon."}}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message.content, "It is noon.");
        assert!(parsed.message.tool_calls.is_empty());
    }

    #[test]
    fn thinking_effort_parse_and_wire() {
        assert_eq!(ThinkingEffort::parse("HIGH"), ThinkingEffort::High);
        assert_eq!(ThinkingEffort::parse("none"), ThinkingEffort::Off);
        assert_eq!(ThinkingEffort::Off.wire_value(), None);
        assert_eq!(ThinkingEffort::Medium.wire_value(), Some("medium"));
    }

    #[test]
    fn payload_omits_tools_when_disabled() {
        let request = ChatRequest {
            model: "gemma3:4b".to_string(),
            messages: vec![ChatMessage::user("hi")],
            tools: None,
            think: ThinkingEffort::Off,
        };
        let payload = OllamaClient::payload(&request);
        assert!(payload.get("tools").is_none());
        assert!(payload.get("think").is_none());
        assert_eq!(payload["stream"], false);
    }
}
