//! Text-to-speech client and voice selection
//!
//! Talks to an OpenAI-compatible `/v1/audio/speech` endpoint (a local
//! Kokoro server by default) and decodes the MP3 reply into mono samples.

use std::io::Cursor;
use std::sync::Mutex;

use crate::audio::Speech;
use crate::{Error, Result};

/// Default TTS endpoint (local Kokoro-compatible server)
pub const DEFAULT_TTS_URL: &str = "http://localhost:8880";

/// Default speaking voice
pub const DEFAULT_VOICE: &str = "af_heart";

/// Available voices: id and a short description the model can pick from
pub const VOICES: &[(&str, &str)] = &[
    // Female
    ("af_heart", "warm female, default, high quality"),
    ("af_bella", "confident female, high quality"),
    ("af_nicole", "soft whispery female"),
    ("af_aoede", "clear female"),
    ("af_kore", "calm female"),
    ("af_sarah", "friendly female"),
    ("af_alloy", "neutral female"),
    ("af_nova", "bright female"),
    ("af_sky", "light female"),
    ("af_jessica", "casual female"),
    ("af_river", "smooth female"),
    // Male
    ("am_fenrir", "deep strong male"),
    ("am_michael", "steady male"),
    ("am_puck", "playful male"),
    ("am_adam", "low male"),
    ("am_echo", "resonant male"),
    ("am_eric", "clear male"),
    ("am_liam", "young male"),
    ("am_onyx", "dark male"),
    ("am_santa", "jolly male"),
];

/// Whether a voice id is in the catalog
#[must_use]
pub fn is_known_voice(voice: &str) -> bool {
    VOICES.iter().any(|(id, _)| *id == voice)
}

/// Current speaking voice: a default plus a one-shot override
///
/// The override is armed by the `set_voice` tool and consumed by the next
/// synthesis call.
pub struct VoiceSelector {
    default_voice: String,
    override_voice: Mutex<Option<String>>,
}

impl VoiceSelector {
    /// Create a selector with the given default voice
    #[must_use]
    pub fn new(default_voice: impl Into<String>) -> Self {
        Self {
            default_voice: default_voice.into(),
            override_voice: Mutex::new(None),
        }
    }

    /// Arm a one-shot override for the next utterance
    pub fn set_override(&self, voice: impl Into<String>) {
        *self.override_voice.lock().unwrap() = Some(voice.into());
    }

    /// Voice for the next utterance; consumes any armed override
    #[must_use]
    pub fn take(&self) -> String {
        self.override_voice
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| self.default_voice.clone())
    }
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl TextToSpeech {
    /// Create a TTS client
    ///
    /// `api_key` may be `None` for local servers that skip authentication.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    /// Synthesize text into mono samples at the provider's sample rate
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the MP3 decode fails
    pub async fn synthesize(&self, text: &str, voice: &str, speed: f32) -> Result<Speech> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed,
            response_format: "mp3",
        };

        tracing::debug!(voice, chars = text.len(), "synthesizing speech");

        let mut builder = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        decode_mp3(&audio)
    }
}

/// Decode MP3 bytes to mono f32 samples
///
/// Stereo frames are averaged down to one channel.
fn decode_mp3(mp3_data: &[u8]) -> Result<Speech> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    #[allow(clippy::cast_sign_loss)]
                    {
                        sample_rate = frame.sample_rate.max(0) as u32;
                    }
                }

                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Tts(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Tts("empty audio in TTS response".to_string()));
    }

    Ok(Speech {
        samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_is_consumed_once() {
        let voices = VoiceSelector::new(DEFAULT_VOICE);

        assert_eq!(voices.take(), DEFAULT_VOICE);

        voices.set_override("am_fenrir");
        assert_eq!(voices.take(), "am_fenrir");
        // Consumed: falls back to the default again
        assert_eq!(voices.take(), DEFAULT_VOICE);
    }

    #[test]
    fn later_override_wins() {
        let voices = VoiceSelector::new(DEFAULT_VOICE);
        voices.set_override("am_puck");
        voices.set_override("af_nicole");
        assert_eq!(voices.take(), "af_nicole");
    }

    #[test]
    fn catalog_contains_default_voice() {
        assert!(is_known_voice(DEFAULT_VOICE));
        assert!(!is_known_voice("no_such_voice"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_mp3(&[0u8; 16]).is_err());
    }
}
