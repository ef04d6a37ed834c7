//! Interactive voice shell
//!
//! One turn per key-press cycle: hold a key to record, release to
//! transcribe, think, and speak. Recovered errors (nothing captured, empty
//! transcript, a failed turn) return to the idle prompt without audio.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::agent::Agent;
use crate::audio::{samples_to_wav, AudioCapture};
use crate::speaker::{Speaker, SpeechOutput};
use crate::stt::SpeechToText;
use crate::Result;

/// Quiet window after the last key repeat that counts as key release
const HOLD_TIMEOUT: Duration = Duration::from_millis(500);

const BANNER: &str = "
========================================
  Murmur Voice Assistant
========================================
";

/// Restores cooked terminal mode on drop
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Record → transcribe → ask → speak, once per key-press cycle
pub struct Shell {
    capture: AudioCapture,
    stt: SpeechToText,
    agent: Arc<Agent>,
    speaker: Arc<Speaker>,
}

impl Shell {
    /// Assemble the shell from its collaborators
    #[must_use]
    pub fn new(
        capture: AudioCapture,
        stt: SpeechToText,
        agent: Arc<Agent>,
        speaker: Arc<Speaker>,
    ) -> Self {
        Self {
            capture,
            stt,
            agent,
            speaker,
        }
    }

    /// Run the interactive loop until the user quits
    ///
    /// # Errors
    ///
    /// Returns an error on terminal or audio device failure; provider
    /// failures only abort the current turn
    pub async fn run(&mut self) -> Result<()> {
        println!("{BANNER}");

        loop {
            println!("Hold [R] to record | [Q] to quit\n");

            let Some(samples) = self.wait_and_record()? else {
                break;
            };

            if samples.is_empty() {
                println!("No audio recorded.");
                continue;
            }

            let wav = samples_to_wav(&samples, self.capture.sample_rate())?;

            println!("Transcribing...");
            let text = match self.stt.transcribe_wav(&wav).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "transcription failed");
                    continue;
                }
            };

            if text.is_empty() {
                println!("No speech detected.");
                continue;
            }
            println!("You: {text}");

            println!("Thinking...");
            let response = match self.agent.ask(&text).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "turn failed");
                    continue;
                }
            };
            println!("AI: {response}");

            if response.is_empty() {
                continue;
            }

            println!("Speaking...");
            if let Err(e) = self.speaker.say(&response).await {
                tracing::error!(error = %e, "playback failed");
            }
        }

        println!("\nGoodbye!");
        Ok(())
    }

    /// Block until R or Q; on R, record while the key is held
    ///
    /// Returns `None` on quit, otherwise the captured samples (possibly
    /// empty). Key release is detected by the terminal's key-repeat going
    /// quiet for [`HOLD_TIMEOUT`].
    fn wait_and_record(&mut self) -> Result<Option<Vec<f32>>> {
        let _raw = RawModeGuard::enter()?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                continue;
            }
            match key.code {
                KeyCode::Char('q' | 'Q') => return Ok(None),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None);
                }
                KeyCode::Char('r' | 'R') => break,
                _ => {}
            }
        }

        self.capture.clear_buffer();
        self.capture.start()?;

        print!("  Recording...\r");
        let _ = std::io::stdout().flush();

        // Drain key repeats; a quiet window means the key was released.
        loop {
            if event::poll(HOLD_TIMEOUT)? {
                let _ = event::read()?;
            } else {
                break;
            }
        }

        self.capture.stop();

        print!("{}\r", " ".repeat(40));
        let _ = std::io::stdout().flush();

        Ok(Some(self.capture.take_buffer()))
    }
}
