//! Voice selection tool

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolDefinition};
use crate::tts::{is_known_voice, VoiceSelector, VOICES};
use crate::Result;

/// Changes the speaking voice for the next response
pub struct SetVoiceTool {
    voices: Arc<VoiceSelector>,
}

impl SetVoiceTool {
    /// Create the tool bound to the shared voice selector
    #[must_use]
    pub fn new(voices: Arc<VoiceSelector>) -> Self {
        Self { voices }
    }
}

#[derive(Deserialize)]
struct SetVoiceArgs {
    voice: String,
}

#[async_trait]
impl Tool for SetVoiceTool {
    fn name(&self) -> &'static str {
        "set_voice"
    }

    fn definition(&self) -> ToolDefinition {
        let catalog = VOICES
            .iter()
            .map(|(id, desc)| format!("{id} ({desc})"))
            .collect::<Vec<_>>()
            .join("; ");
        let ids: Vec<&str> = VOICES.iter().map(|(id, _)| *id).collect();

        ToolDefinition::new(
            "set_voice",
            format!(
                "Change the speaking voice for the next response. \
                 Use this when the user asks to change voice, tone, mood, or gender. \
                 Available voices: {catalog}"
            ),
            BTreeMap::from([(
                "voice",
                json!({
                    "type": "string",
                    "enum": ids,
                    "description": "The voice ID to use.",
                }),
            )]),
            &["voice"],
        )
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let args: SetVoiceArgs = serde_json::from_value(args)?;

        if !is_known_voice(&args.voice) {
            let ids = VOICES
                .iter()
                .map(|(id, _)| *id)
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(format!("Unknown voice '{}'. Available: {ids}", args.voice));
        }

        tracing::info!(voice = %args.voice, "voice override armed");
        self.voices.set_override(args.voice);
        Ok("Done.".to_string())
    }
}
