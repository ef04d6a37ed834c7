//! Microphone capture

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Preferred capture rate for speech (whisper-family models expect 16 kHz)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Env var overriding the capture sample rate
const SAMPLE_RATE_ENV: &str = "MURMUR_SAMPLE_RATE";

/// Captures mono audio from the default input device
///
/// The device's supported rates vary; construction walks a candidate list
/// (env override, device default, 16 kHz, 48 kHz, 44.1 kHz) and keeps the
/// first one the device accepts.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    sample_rate: u32,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns an error if there is no input device or none of the candidate
    /// sample rates is supported
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let (config, sample_rate) = pick_input_config(&device)?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            sample_rate,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Begin recording into the shared buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop recording; captured samples stay in the buffer
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("audio capture stopped");
        }
    }

    /// Drain the captured samples
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Discard anything captured so far
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// The rate the device actually records at
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Walk candidate sample rates and return the first supported mono config
fn pick_input_config(device: &Device) -> Result<(StreamConfig, u32)> {
    let mut candidates: Vec<u32> = Vec::new();

    if let Ok(value) = std::env::var(SAMPLE_RATE_ENV) {
        if let Ok(rate) = value.trim().parse::<u32>() {
            candidates.push(rate);
        }
    }
    if let Ok(default) = device.default_input_config() {
        candidates.push(default.sample_rate().0);
    }
    candidates.extend([CAPTURE_SAMPLE_RATE, 48000, 44100]);
    candidates.dedup();

    for rate in candidates {
        if rate == 0 {
            continue;
        }
        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(rate)
                    && c.max_sample_rate() >= SampleRate(rate)
            });
        if let Some(supported) = supported {
            let config = supported.with_sample_rate(SampleRate(rate)).config();
            return Ok((config, rate));
        }
    }

    Err(Error::Audio(
        "no supported mono input configuration found".to_string(),
    ))
}

/// Encode f32 samples as 16-bit PCM WAV bytes for the STT API
///
/// # Errors
///
/// Returns an error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
