//! Tool registry and schema types
//!
//! Tools are named, schema-described operations the chat provider may
//! request. The registry is populated once at startup and is read-only
//! afterwards; dispatch is a direct lookup by name.

mod datetime;
mod schedule;
mod voice;

pub use datetime::DateTimeTool;
pub use schedule::{
    CancelReminderTool, ListRemindersTool, ScheduleReminderTool, ScheduleTaskTool,
    SCHEDULING_TOOLS,
};
pub use voice::SetVoiceTool;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::Result;

/// Tool definition in the OpenAI-compatible function shape
///
/// Accepted by both Ollama `/api/chat` and OpenAI-style `/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: FunctionDefinition,
}

/// The function half of a tool definition
#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema parameter spec: `{type, properties, required}`
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Build a definition from a name, description and parameter spec
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: BTreeMap<&str, serde_json::Value>,
        required: &[&str],
    ) -> Self {
        let props: serde_json::Map<String, serde_json::Value> = properties
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            tool_type: "function",
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters: json!({
                    "type": "object",
                    "properties": props,
                    "required": required,
                }),
            },
        }
    }
}

/// A named, schema-described, side-effecting operation
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registered tool name
    fn name(&self) -> &'static str;

    /// Schema exposed to the chat provider
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied argument mapping
    ///
    /// Binding is permissive: unknown extra keys are ignored and optional
    /// keys take their defaults; only missing required fields reject.
    ///
    /// # Errors
    ///
    /// Returns an error if required arguments are missing or the handler
    /// itself fails
    async fn execute(&self, args: serde_json::Value) -> Result<String>;
}

/// Static association of tool name to schema and handler
///
/// No runtime mutation after startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; call order fixes the order definitions are offered in
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Look up a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Definitions for all registered tools minus the excluded names
    #[must_use]
    pub fn definitions(&self, excluded: &[&str]) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .filter(|t| !excluded.contains(&t.name()))
            .map(|t| t.definition())
            .collect()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(
                "echo",
                "Echo the input back",
                BTreeMap::from([(
                    "text",
                    json!({"type": "string", "description": "Text to echo"}),
                )]),
                &["text"],
            )
        }

        async fn execute(&self, args: serde_json::Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[test]
    fn registry_lookup_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn definitions_respect_exclusions() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        assert_eq!(registry.definitions(&[]).len(), 1);
        assert!(registry.definitions(&["echo"]).is_empty());
    }

    #[test]
    fn definition_serializes_to_function_schema() {
        let def = EchoTool.definition();
        let value = serde_json::to_value(&def).unwrap();

        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "echo");
        assert_eq!(value["function"]["parameters"]["type"], "object");
        assert_eq!(
            value["function"]["parameters"]["properties"]["text"]["type"],
            "string"
        );
        assert_eq!(value["function"]["parameters"]["required"][0], "text");
    }
}
