//! Speaker playback

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use super::Speech;
use crate::{Error, Result};

/// Poll interval while waiting for a stream to drain
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra wait beyond the utterance's nominal duration before giving up
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Plays utterances on the default output device
///
/// `play` opens the device fresh each time (the default output can change
/// between utterances) and blocks until the utterance finishes, is cut by
/// [`Self::stop`], or the bounded wait elapses. The caller serializes
/// access (see `crate::speaker`); `stop` exists so a new owner can cut
/// audio left over from a wait that timed out.
pub struct AudioPlayback {
    cut: Arc<AtomicBool>,
}

impl AudioPlayback {
    /// Verify an output device exists
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available
    pub fn new() -> Result<Self> {
        let device = default_output_device()?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self {
            cut: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cut whatever is currently sounding
    pub fn stop(&self) {
        self.cut.store(true, Ordering::SeqCst);
    }

    /// Play an utterance to completion
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the utterance's sample rate or
    /// the stream cannot be built
    pub fn play(&self, speech: &Speech) -> Result<()> {
        if speech.samples.is_empty() {
            return Ok(());
        }

        let device = default_output_device()?;
        let config = pick_output_config(&device, speech.sample_rate)?;
        let channels = config.channels as usize;

        self.cut.store(false, Ordering::SeqCst);

        let samples: Arc<Vec<f32>> = Arc::new(speech.samples.clone());
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let cb_samples = Arc::clone(&samples);
        let cb_position = Arc::clone(&position);
        let cb_finished = Arc::clone(&finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = cb_position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = if pos < cb_samples.len() {
                            let s = cb_samples[pos];
                            pos += 1;
                            s
                        } else {
                            cb_finished.store(true, Ordering::Relaxed);
                            0.0
                        };
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    cb_position.store(pos, Ordering::Relaxed);
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let deadline = Instant::now() + Duration::from_millis(speech.duration_ms()) + DRAIN_GRACE;
        while !finished.load(Ordering::Relaxed) && !self.cut.load(Ordering::SeqCst) {
            if Instant::now() > deadline {
                tracing::warn!("playback drain deadline reached");
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        drop(stream);
        tracing::debug!(samples = samples.len(), "playback complete");
        Ok(())
    }
}

fn default_output_device() -> Result<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))
}

/// Find an output config at the utterance's rate, mono preferred
fn pick_output_config(device: &Device, sample_rate: u32) -> Result<StreamConfig> {
    let find = |wanted_channels: u16| -> Option<StreamConfig> {
        device
            .supported_output_configs()
            .ok()?
            .find(|c| {
                c.channels() == wanted_channels
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .map(|c| c.with_sample_rate(SampleRate(sample_rate)).config())
    };

    find(1)
        .or_else(|| find(2))
        .ok_or_else(|| Error::Audio(format!("no output config supports {sample_rate} Hz")))
}
