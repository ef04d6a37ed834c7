//! Serialized speech output
//!
//! Exactly one utterance plays at a time. Both the foreground shell and
//! firing scheduler actions speak through the same [`Speaker`], whose
//! internal lock is disjoint from the scheduler's pending-action table lock —
//! a long utterance never blocks scheduling or cancellation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::audio::AudioPlayback;
use crate::tts::{TextToSpeech, VoiceSelector};
use crate::Result;

/// Something that can speak text aloud
///
/// The scheduler depends on this seam rather than on the concrete
/// [`Speaker`], so timer behavior is testable without audio hardware.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak the text, blocking until playback completes
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis or playback fails
    async fn say(&self, text: &str) -> Result<()>;
}

/// Synthesizes and plays utterances under one exclusive audio lock
pub struct Speaker {
    tts: TextToSpeech,
    voices: Arc<VoiceSelector>,
    speed: f32,
    playback: Mutex<AudioPlayback>,
}

impl Speaker {
    /// Create a speaker on the default output device
    ///
    /// # Errors
    ///
    /// Returns an error if the output device cannot be opened
    pub fn new(tts: TextToSpeech, voices: Arc<VoiceSelector>, speed: f32) -> Result<Self> {
        Ok(Self {
            tts,
            voices,
            speed,
            playback: Mutex::new(AudioPlayback::new()?),
        })
    }
}

#[async_trait]
impl SpeechOutput for Speaker {
    async fn say(&self, text: &str) -> Result<()> {
        // Own the device for the whole utterance; cut anything still
        // sounding from a previous owner before starting.
        let playback = self.playback.lock().await;
        playback.stop();

        let voice = self.voices.take();
        let speech = self.tts.synthesize(text, &voice, self.speed).await?;

        tracing::debug!(voice = %voice, duration_ms = speech.duration_ms(), "speaking");
        playback.play(&speech)
    }
}
