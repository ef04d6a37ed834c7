//! Audio capture and playback
//!
//! Thin adaptation over cpal. Capture feeds the STT pipeline; playback is
//! owned by the [`crate::speaker::Speaker`] so that utterances never overlap.

mod capture;
mod playback;

pub use capture::{samples_to_wav, AudioCapture, CAPTURE_SAMPLE_RATE};
pub use playback::AudioPlayback;

/// A synthesized utterance: mono samples at a given rate
#[derive(Debug, Clone)]
pub struct Speech {
    /// Mono f32 samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Samples per second
    pub sample_rate: u32,
}

impl Speech {
    /// Playback duration in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / u64::from(self.sample_rate)
    }
}
