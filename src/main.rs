use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait};
use tracing_subscriber::EnvFilter;

use murmur::agent::{Agent, AgentOptions};
use murmur::audio::{AudioCapture, AudioPlayback, Speech};
use murmur::llm::OllamaClient;
use murmur::scheduler::ReminderScheduler;
use murmur::shell::Shell;
use murmur::speaker::{Speaker, SpeechOutput};
use murmur::stt::SpeechToText;
use murmur::tools::{
    CancelReminderTool, DateTimeTool, ListRemindersTool, ScheduleReminderTool, ScheduleTaskTool,
    SetVoiceTool, ToolRegistry,
};
use murmur::tts::{TextToSpeech, VoiceSelector};
use murmur::Config;

/// Murmur - voice-driven assistant shell
#[derive(Parser)]
#[command(name = "murmur", version, about)]
struct Cli {
    /// Chat model identifier (e.g. "gemma3:4b")
    #[arg(short, long, env = "MURMUR_MODEL")]
    model: Option<String>,

    /// Disable tool calling globally
    #[arg(long)]
    no_tools: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List audio input and output devices
    Devices,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Transcribe a WAV file and print the text
    Transcribe {
        /// Path to the WAV file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,murmur=info",
        1 => "info,murmur=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if cli.no_tools {
        config.tools_enabled = false;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Devices => list_devices(),
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::Transcribe { file } => transcribe(&config, &file).await,
        };
    }

    tracing::info!(
        model = %config.model,
        tools = config.tools_enabled,
        "starting murmur"
    );

    run_shell(config).await
}

/// Wire up the collaborators and run the interactive loop
#[allow(clippy::future_not_send)]
async fn run_shell(config: Config) -> anyhow::Result<()> {
    let voices = Arc::new(VoiceSelector::new(config.tts.voice.clone()));
    let tts = TextToSpeech::new(
        &config.tts.base_url,
        config.tts.api_key.clone(),
        &config.tts.model,
    );
    let speaker = Arc::new(Speaker::new(tts, Arc::clone(&voices), config.tts.speed)?);

    let scheduler = ReminderScheduler::new(Arc::clone(&speaker) as Arc<dyn SpeechOutput>);

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DateTimeTool));
    registry.register(Arc::new(SetVoiceTool::new(Arc::clone(&voices))));
    registry.register(Arc::new(ScheduleReminderTool::new(Arc::clone(&scheduler))));
    registry.register(Arc::new(ScheduleTaskTool::new(Arc::clone(&scheduler))));
    registry.register(Arc::new(ListRemindersTool::new(Arc::clone(&scheduler))));
    registry.register(Arc::new(CancelReminderTool::new(Arc::clone(&scheduler))));

    let provider = Arc::new(OllamaClient::new(&config.ollama_url));
    let agent = Arc::new(Agent::new(
        provider,
        Arc::new(registry),
        AgentOptions {
            model: config.model.clone(),
            tools_enabled: config.tools_enabled,
            think: config.think,
        },
    ));
    scheduler.bind_agent(Arc::clone(&agent));

    let capture = AudioCapture::new()?;
    let stt = SpeechToText::new(
        &config.stt.base_url,
        config.stt.api_key.clone(),
        &config.stt.model,
    );

    let mut shell = Shell::new(capture, stt, agent, speaker);
    shell.run().await?;
    Ok(())
}

/// List audio devices, marking the defaults
fn list_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let default_in = host.default_input_device().and_then(|d| d.name().ok());
    let default_out = host.default_output_device().and_then(|d| d.name().ok());

    println!("Input devices:");
    for device in host.input_devices()? {
        let name = device.name().unwrap_or_default();
        let mark = if Some(&name) == default_in.as_ref() { "*" } else { " " };
        println!("{mark} {name}");
    }

    println!("\nOutput devices:");
    for device in host.output_devices()? {
        let name = device.name().unwrap_or_default();
        let mark = if Some(&name) == default_out.as_ref() { "*" } else { " " };
        println!("{mark} {name}");
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for _ in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let samples = capture.take_buffer();
        let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bar = "#".repeat((peak * 40.0).min(40.0) as usize);
        println!("peak {peak:.3} {bar}");
    }

    capture.stop();
    Ok(())
}

/// Play a one-second test tone
fn test_speaker() -> anyhow::Result<()> {
    println!("Playing test tone...");

    let sample_rate = 24000u32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            0.2 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();

    let playback = AudioPlayback::new()?;
    playback.play(&Speech {
        samples,
        sample_rate,
    })?;

    println!("Done.");
    Ok(())
}

/// Synthesize and speak the given text
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    let voices = Arc::new(VoiceSelector::new(config.tts.voice.clone()));
    let tts = TextToSpeech::new(
        &config.tts.base_url,
        config.tts.api_key.clone(),
        &config.tts.model,
    );
    let speaker = Speaker::new(tts, voices, config.tts.speed)?;

    println!("Speaking: {text}");
    speaker.say(text).await?;
    Ok(())
}

/// Transcribe a WAV file and print the text
async fn transcribe(config: &Config, file: &std::path::Path) -> anyhow::Result<()> {
    let stt = SpeechToText::new(
        &config.stt.base_url,
        config.stt.api_key.clone(),
        &config.stt.model,
    );
    let text = stt.transcribe_file(file).await?;
    println!("{text}");
    Ok(())
}
