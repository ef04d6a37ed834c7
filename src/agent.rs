//! Agent tool-calling loop
//!
//! Resolves one instruction into a final textual answer, letting the chat
//! provider request tool side effects along the way. Bounded to
//! [`MAX_TOOL_ROUNDS`] provider round-trips per invocation.

use std::sync::Arc;

use crate::llm::{ChatMessage, ChatProvider, ChatRequest, ChatResponse, ThinkingEffort};
use crate::prompt::SYSTEM_PROMPT;
use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// Maximum provider round-trips per `ask` invocation
pub const MAX_TOOL_ROUNDS: usize = 3;

/// Per-process agent configuration
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Chat model identifier
    pub model: String,
    /// Globally enable/disable tool calling
    pub tools_enabled: bool,
    /// Thinking-effort hint forwarded to the provider
    pub think: ThinkingEffort,
}

/// Drives bounded multi-round conversations with the chat provider
///
/// Holds no per-conversation state: `ask` is reentrant and may run
/// concurrently from the interactive shell and from firing timer tasks.
pub struct Agent {
    provider: Arc<dyn ChatProvider>,
    registry: Arc<ToolRegistry>,
    options: AgentOptions,
}

impl Agent {
    /// Create an agent over a provider and a populated tool registry
    #[must_use]
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        registry: Arc<ToolRegistry>,
        options: AgentOptions,
    ) -> Self {
        Self {
            provider,
            registry,
            options,
        }
    }

    /// Resolve an instruction with the full tool set and default persona
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails, the model requests an
    /// unregistered tool, or a tool handler fails
    pub async fn ask(&self, text: &str) -> Result<String> {
        self.ask_with(text, &[], None).await
    }

    /// Resolve an instruction, withholding `excluded_tools` and optionally
    /// overriding the system prompt
    ///
    /// Deferred tasks run through here with the scheduling tools excluded so
    /// a task cannot re-schedule indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails, the model requests an
    /// unregistered tool, or a tool handler fails
    pub async fn ask_with(
        &self,
        text: &str,
        excluded_tools: &[&str],
        system_prompt: Option<&str>,
    ) -> Result<String> {
        let system = system_prompt.unwrap_or(SYSTEM_PROMPT);
        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(text)];

        let tools = if self.options.tools_enabled {
            let definitions = self.registry.definitions(excluded_tools);
            if definitions.is_empty() {
                None
            } else {
                Some(definitions)
            }
        } else {
            None
        };

        let mut last_response = ChatResponse::default();

        for round in 0..MAX_TOOL_ROUNDS {
            let request = ChatRequest {
                model: self.options.model.clone(),
                messages: messages.clone(),
                tools: tools.clone(),
                think: self.options.think,
            };

            let response = self.provider.chat(&request).await?;

            if response.tool_calls.is_empty() {
                return Ok(response.content.trim().to_string());
            }

            tracing::debug!(
                round,
                calls = response.tool_calls.len(),
                "model requested tool calls"
            );

            messages.push(ChatMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let tool = self.registry.get(&call.name).ok_or_else(|| {
                    Error::Tool(format!("unknown tool requested: {}", call.name))
                })?;

                let output = tool.execute(call.arguments.clone()).await?;
                tracing::debug!(tool = %call.name, output = %output, "tool executed");
                messages.push(ChatMessage::tool(output));
            }

            last_response = response;
        }

        // Round budget exhausted with tools still requested: soft
        // degradation — return whatever text the last response carried.
        tracing::warn!("tool round budget exhausted, returning last response text");
        Ok(last_response.content.trim().to_string())
    }
}
