use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use parley::voice::{
    AudioCapture, AudioPlayback, MicrophoneListener, SAMPLE_RATE, SampleSource, SpeechDetector,
    SpeechToText, TextToSpeech, VoiceOutput, WakeGate, rms, samples_to_millis, samples_to_wav,
};
use parley::{ChatClient, Config, TurnController, TurnSettings};

/// Parley - Wake-word gated voice assistant
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Path to config file (defaults to ~/.config/omni/parley/config.toml)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Phrase that wakes the assistant (overrides config)
    #[arg(short, long)]
    wake_phrase: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Calibrate to the room and meter microphone levels
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Play a chime through the resampler and output device
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Record from the microphone and print the transcript
    TestStt {
        /// Recording length in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
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
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(phrase) = &cli.wake_phrase {
        config.set_wake_phrase(phrase)?;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::TestStt { duration } => test_stt(&config, duration).await,
        };
    }

    tracing::info!(
        assistant = %config.assistant.name,
        wake_phrase = %config.assistant.wake_phrase,
        llm = %config.llm.model,
        stt = %config.stt.provider,
        tts = %config.tts.provider,
        "starting parley"
    );
    tracing::debug!(?config, "loaded configuration");

    let listener = MicrophoneListener::new(
        AudioCapture::new(config.listen.timeout + config.listen.phrase_time_limit)?,
        SpeechToText::new(&config.stt)?,
        config.listen.ambient_window,
    );
    let engine = ChatClient::new(&config.llm)?;
    let speaker = VoiceOutput::new(TextToSpeech::new(&config.tts)?, AudioPlayback::new()?);
    let gate = WakeGate::new(&config.assistant.wake_phrase)?;

    let mut controller = TurnController::new(
        listener,
        engine,
        speaker,
        gate,
        config.assistant.persona_prompt.clone(),
        TurnSettings::from_config(&config),
    );

    // Set up shutdown signal
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    controller.run(&mut shutdown_rx).await;
    tracing::info!("parley stopped");
    Ok(())
}

/// Measure the room, then show per-second levels against the speech threshold
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    const SECOND: Duration = Duration::from_secs(1);

    let mut capture = AudioCapture::new(SECOND * 2)?;
    capture.start()?;

    println!("Stay quiet for a second while the room is measured...");
    tokio::time::sleep(SECOND).await;
    let mut detector = SpeechDetector::default();
    detector.calibrate(&capture.drain());
    let threshold = detector.threshold();

    println!("Speech threshold: {threshold:.4} RMS");
    println!("Now speak for {duration} seconds.");
    println!("---");

    let mut voiced = 0;
    for i in 1..=duration {
        tokio::time::sleep(SECOND).await;
        let level = rms(&capture.drain());

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bar = ((level / threshold) * 10.0).min(40.0) as usize;
        let verdict = if level > threshold {
            voiced += 1;
            "speech"
        } else {
            "quiet"
        };
        println!("[{i:2}s] {level:.4} {verdict:>6} |{:<40}|", "=".repeat(bar));
    }

    capture.stop();

    println!("---");
    println!("{voiced} of {duration} seconds were loud enough to count as speech.");
    if voiced == 0 {
        println!("Nothing crossed the threshold. Check the default input device and its gain.");
    }

    Ok(())
}

/// Play a rising two-note chime recorded at the capture rate
///
/// The chime goes through the same resampler as synthesized speech.
async fn test_speaker() -> anyhow::Result<()> {
    let mut playback = AudioPlayback::new()?;
    println!(
        "Playing a chime at {SAMPLE_RATE} Hz on a {} Hz device...",
        playback.sample_rate()
    );

    let note_len = SAMPLE_RATE as usize / 2;
    #[allow(clippy::cast_precision_loss)]
    let chime: Vec<f32> = [523.25_f32, 783.99]
        .iter()
        .flat_map(|&pitch| {
            (0..note_len).map(move |i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let fade = 1.0 - i as f32 / note_len as f32;
                (std::f32::consts::TAU * pitch * t).sin() * 0.3 * fade
            })
        })
        .collect();

    playback.play(chime, SAMPLE_RATE).await?;

    println!("Done. No sound means the default output device is muted or missing.");
    Ok(())
}

/// Test TTS output with the configured provider
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing {} TTS with text: \"{text}\"\n", config.tts.provider);

    let tts = TextToSpeech::new(&config.tts)?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let mut playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Test STT by transcribing a fixed-length recording
async fn test_stt(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing {} STT, recording for {duration} seconds...", config.stt.provider);
    println!("Say something!\n");

    let stt = SpeechToText::new(&config.stt)?;
    let length = Duration::from_secs(duration);
    let mut capture = AudioCapture::new(length)?;
    capture.start()?;
    tokio::time::sleep(length).await;
    let samples = capture.drain();
    capture.stop();

    println!("Captured {} ms, transcribing...", samples_to_millis(samples.len()));
    let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
    let transcript = stt.transcribe(&wav).await?;

    println!("\n---");
    if transcript.is_empty() {
        println!("No speech recognized.");
    } else {
        println!("Heard: \"{transcript}\"");
    }

    Ok(())
}
