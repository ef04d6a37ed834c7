//! Agent loop integration tests
//!
//! Drive the loop with a scripted chat provider: no network, no audio.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use murmur::agent::{Agent, AgentOptions, MAX_TOOL_ROUNDS};
use murmur::llm::{
    ChatProvider, ChatRequest, ChatResponse, Role, ThinkingEffort, ToolCallRequest,
};
use murmur::tools::{Tool, ToolDefinition, ToolRegistry};
use murmur::{Error, Result};

/// One observed provider round-trip
struct RecordedRequest {
    system: String,
    roles: Vec<Role>,
    last_content: String,
    /// Tool names offered, `None` when tool calling was disabled
    tool_names: Option<Vec<String>>,
}

/// Provider that replays a scripted response list and records every request
struct ScriptedProvider {
    script: Mutex<Vec<ChatResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> RecordedRequest {
        let requests = self.requests.lock().unwrap();
        let r = &requests[index];
        RecordedRequest {
            system: r.system.clone(),
            roles: r.roles.clone(),
            last_content: r.last_content.clone(),
            tool_names: r.tool_names.clone(),
        }
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let recorded = RecordedRequest {
            system: request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            roles: request.messages.iter().map(|m| m.role).collect(),
            last_content: request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            tool_names: request.tools.as_ref().map(|tools| {
                tools.iter().map(|t| t.function.name.clone()).collect()
            }),
        };
        self.requests.lock().unwrap().push(recorded);

        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Ok(ChatResponse::default());
        }
        Ok(script.remove(0))
    }
}

fn tool_call(name: &str, arguments: serde_json::Value) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        tool_calls: vec![ToolCallRequest {
            name: name.to_string(),
            arguments,
        }],
    }
}

fn text(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        tool_calls: Vec::new(),
    }
}

/// Trivial tool that echoes its `text` argument
struct EchoTool {
    name: &'static str,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name,
            "Echo the text argument back",
            BTreeMap::from([(
                "text",
                json!({"type": "string", "description": "Text to echo"}),
            )]),
            &[],
        )
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        Ok(args["text"].as_str().unwrap_or_default().to_string())
    }
}

/// Tool whose handler always fails
struct FailTool;

#[async_trait]
impl Tool for FailTool {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("broken", "Always fails", BTreeMap::new(), &[])
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String> {
        Err(Error::Tool("handler exploded".to_string()))
    }
}

fn build_agent(
    provider: Arc<ScriptedProvider>,
    tools: Vec<Arc<dyn Tool>>,
    tools_enabled: bool,
) -> Agent {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    Agent::new(
        provider,
        Arc::new(registry),
        AgentOptions {
            model: "test-model".to_string(),
            tools_enabled,
            think: ThinkingEffort::Off,
        },
    )
}

#[tokio::test]
async fn plain_text_answer_ends_after_one_round() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("  It is noon.  ")]));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![Arc::new(EchoTool { name: "echo" })],
        true,
    );

    let answer = agent.ask("what time is it").await.unwrap();

    assert_eq!(answer, "It is noon.");
    assert_eq!(provider.request_count(), 1);

    let request = provider.request(0);
    assert_eq!(request.roles, vec![Role::System, Role::User]);
    assert_eq!(request.tool_names, Some(vec!["echo".to_string()]));
}

#[tokio::test]
async fn round_budget_caps_provider_roundtrips() {
    // The model never stops requesting tools; the loop must cut off at
    // MAX_TOOL_ROUNDS and return the last response's text.
    let script = (0..5)
        .map(|i| {
            let mut response = tool_call("echo", json!({"text": format!("round {i}")}));
            response.content = format!("still working {i}");
            response
        })
        .collect();
    let provider = Arc::new(ScriptedProvider::new(script));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![Arc::new(EchoTool { name: "echo" })],
        true,
    );

    let answer = agent.ask("loop forever").await.unwrap();

    assert_eq!(provider.request_count(), MAX_TOOL_ROUNDS);
    assert_eq!(answer, "still working 2");
}

#[tokio::test]
async fn tool_results_are_fed_back_to_the_model() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call("echo", json!({"text": "ping"})),
        text("pong"),
    ]));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![Arc::new(EchoTool { name: "echo" })],
        true,
    );

    let answer = agent.ask("bounce this").await.unwrap();
    assert_eq!(answer, "pong");
    assert_eq!(provider.request_count(), 2);

    // Second round sees system, user, assistant tool-call, tool result
    let request = provider.request(1);
    assert_eq!(
        request.roles,
        vec![Role::System, Role::User, Role::Assistant, Role::Tool]
    );
    assert_eq!(request.last_content, "ping");
}

#[tokio::test]
async fn excluded_tools_are_never_offered() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("ok")]));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![
            Arc::new(EchoTool { name: "echo" }),
            Arc::new(EchoTool {
                name: "schedule_task",
            }),
        ],
        true,
    );

    agent
        .ask_with("no self-scheduling", &["schedule_task"], None)
        .await
        .unwrap();

    let offered = provider.request(0).tool_names.unwrap();
    assert!(offered.contains(&"echo".to_string()));
    assert!(!offered.contains(&"schedule_task".to_string()));
}

#[tokio::test]
async fn disabling_tools_sends_none() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("ok")]));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![Arc::new(EchoTool { name: "echo" })],
        false,
    );

    agent.ask("anything").await.unwrap();
    assert!(provider.request(0).tool_names.is_none());
}

#[tokio::test]
async fn excluding_every_tool_sends_none() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("ok")]));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![Arc::new(EchoTool { name: "echo" })],
        true,
    );

    agent.ask_with("bare", &["echo"], None).await.unwrap();
    assert!(provider.request(0).tool_names.is_none());
}

#[tokio::test]
async fn system_prompt_override_is_used() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("ok")]));
    let agent = build_agent(Arc::clone(&provider), Vec::new(), true);

    agent
        .ask_with("task text", &[], Some("you are a deferred task"))
        .await
        .unwrap();

    assert_eq!(provider.request(0).system, "you are a deferred task");
}

#[tokio::test]
async fn unknown_tool_request_is_an_error() {
    let provider = Arc::new(ScriptedProvider::new(vec![tool_call(
        "bogus",
        json!({}),
    )]));
    let agent = build_agent(
        Arc::clone(&provider),
        vec![Arc::new(EchoTool { name: "echo" })],
        true,
    );

    let err = agent.ask("call something weird").await.unwrap_err();
    assert!(err.to_string().contains("unknown tool"));
}

#[tokio::test]
async fn failing_handler_aborts_the_round() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call("broken", json!({})),
        text("never reached"),
    ]));
    let agent = build_agent(Arc::clone(&provider), vec![Arc::new(FailTool)], true);

    let err = agent.ask("break it").await.unwrap_err();
    assert!(err.to_string().contains("handler exploded"));
    // The failure aborted the round before a second provider call
    assert_eq!(provider.request_count(), 1);
}
