//! Murmur - voice-driven assistant shell
//!
//! Capture speech while a key is held, transcribe it, resolve it through a
//! tool-calling agent, speak the result. A background scheduler fires
//! reminders and deferred agent tasks concurrently with the interactive
//! loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Shell                           │
//! │    hold-key record  │  transcribe  │  speak          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Agent loop                         │
//! │    chat provider  │  tool registry  │  3 rounds      │
//! └────────────────────┬────────────────────────────────┘
//!                      │ schedule_* tools
//! ┌────────────────────▼────────────────────────────────┐
//! │               Reminder scheduler                     │
//! │    timers  │  cancel by id/keyword  │  re-enter agent│
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod audio;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod scheduler;
pub mod shell;
pub mod speaker;
pub mod stt;
pub mod tools;
pub mod tts;

pub use agent::{Agent, AgentOptions, MAX_TOOL_ROUNDS};
pub use config::Config;
pub use error::{Error, Result};
pub use llm::{
    ChatMessage, ChatProvider, ChatRequest, ChatResponse, OllamaClient, Role, ThinkingEffort,
    ToolCallRequest,
};
pub use scheduler::{ActionKind, ReminderScheduler};
pub use shell::Shell;
pub use speaker::{Speaker, SpeechOutput};
pub use stt::SpeechToText;
pub use tools::{Tool, ToolDefinition, ToolRegistry};
pub use tts::{TextToSpeech, VoiceSelector, DEFAULT_VOICE, VOICES};
