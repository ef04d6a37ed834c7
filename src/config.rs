//! Configuration
//!
//! Defaults, overlaid by an optional TOML file at
//! `~/.config/murmur/config.toml` (all fields optional), then by env vars.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::llm::{ThinkingEffort, DEFAULT_OLLAMA_URL};
use crate::stt::DEFAULT_STT_URL;
use crate::tts::{DEFAULT_TTS_URL, DEFAULT_VOICE};
use crate::Result;

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat model identifier
    pub model: String,

    /// Globally enable/disable tool calling
    pub tools_enabled: bool,

    /// Thinking-effort hint for the chat provider
    pub think: ThinkingEffort,

    /// Ollama base URL
    pub ollama_url: String,

    /// Speech-to-text endpoint
    pub stt: SttConfig,

    /// Text-to-speech endpoint and voice
    pub tts: TtsConfig,
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Bearer key; `None` for local servers
    pub api_key: Option<String>,

    /// Transcription model identifier
    pub model: String,
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// OpenAI-compatible base URL
    pub base_url: String,

    /// Bearer key; `None` for local servers
    pub api_key: Option<String>,

    /// Synthesis model identifier
    pub model: String,

    /// Default voice id
    pub voice: String,

    /// Speed multiplier
    pub speed: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gemma3:4b".to_string(),
            tools_enabled: true,
            think: ThinkingEffort::Off,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            stt: SttConfig {
                base_url: DEFAULT_STT_URL.to_string(),
                api_key: None,
                model: "whisper-1".to_string(),
            },
            tts: TtsConfig {
                base_url: DEFAULT_TTS_URL.to_string(),
                api_key: None,
                model: "kokoro".to_string(),
                voice: DEFAULT_VOICE.to_string(),
                speed: 1.0,
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults, then config file, then env overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_file_path() {
            if path.exists() {
                let raw = std::fs::read_to_string(&path)?;
                let file: ConfigFile = toml::from_str(&raw)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                config.apply_file(file);
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(model) = file.llm.model {
            self.model = model;
        }
        if let Some(enabled) = file.llm.tools_enabled {
            self.tools_enabled = enabled;
        }
        if let Some(thinking) = file.llm.thinking {
            self.think = ThinkingEffort::parse(&thinking);
        }
        if let Some(url) = file.llm.ollama_url {
            self.ollama_url = url;
        }

        if let Some(url) = file.stt.base_url {
            self.stt.base_url = url;
        }
        if let Some(key) = file.stt.api_key {
            self.stt.api_key = Some(key);
        }
        if let Some(model) = file.stt.model {
            self.stt.model = model;
        }

        if let Some(url) = file.tts.base_url {
            self.tts.base_url = url;
        }
        if let Some(key) = file.tts.api_key {
            self.tts.api_key = Some(key);
        }
        if let Some(model) = file.tts.model {
            self.tts.model = model;
        }
        if let Some(voice) = file.tts.voice {
            self.tts.voice = voice;
        }
        if let Some(speed) = file.tts.speed {
            self.tts.speed = speed;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.ollama_url = url;
        }
        if let Ok(model) = std::env::var("MURMUR_MODEL") {
            self.model = model;
        }
        if let Ok(url) = std::env::var("MURMUR_STT_URL") {
            self.stt.base_url = url;
        }
        if let Ok(key) = std::env::var("MURMUR_STT_API_KEY") {
            self.stt.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("MURMUR_TTS_URL") {
            self.tts.base_url = url;
        }
        if let Ok(key) = std::env::var("MURMUR_TTS_API_KEY") {
            self.tts.api_key = Some(key);
        }
    }
}

/// Path of the persistent config file, if a home directory is resolvable
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    ProjectDirs::from("sh", "murmur", "murmur").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// TOML config file schema: a partial overlay on top of defaults
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    llm: LlmFileConfig,

    #[serde(default)]
    stt: SttFileConfig,

    #[serde(default)]
    tts: TtsFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct LlmFileConfig {
    model: Option<String>,
    tools_enabled: Option<bool>,
    /// "off", "low", "medium" or "high"
    thinking: Option<String>,
    ollama_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SttFileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TtsFileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    voice: Option<String>,
    speed: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_services() {
        let config = Config::default();
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert!(config.tools_enabled);
        assert_eq!(config.think, ThinkingEffort::Off);
        assert!(config.stt.api_key.is_none());
    }

    #[test]
    fn file_overlay_is_partial() {
        let file: ConfigFile = toml::from_str(
            r#"
            [llm]
            model = "qwen3:8b"
            thinking = "low"

            [tts]
            voice = "am_fenrir"
            speed = 1.2
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(file);

        assert_eq!(config.model, "qwen3:8b");
        assert_eq!(config.think, ThinkingEffort::Low);
        assert_eq!(config.tts.voice, "am_fenrir");
        assert!((config.tts.speed - 1.2).abs() < f32::EPSILON);
        // Untouched sections keep their defaults
        assert_eq!(config.stt.base_url, DEFAULT_STT_URL);
        assert!(config.tools_enabled);
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let file: ConfigFile = toml::from_str("").unwrap();
        let mut config = Config::default();
        config.apply_file(file);
        assert_eq!(config.model, Config::default().model);
    }
}
