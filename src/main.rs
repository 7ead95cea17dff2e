use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use voice_ask::config::file::{config_file_path, parse_config_file};
use voice_ask::input::{Collaborators, ControllerState, Question, SpeechEngine};
use voice_ask::voice::{self, AudioCapture, SpeechSegmenter, rms};
use voice_ask::{Config, SharedPlayback};

/// voice-ask - Ask questions hands-free with a wake word
#[derive(Parser)]
#[command(name = "voice-ask", version, about)]
struct Cli {
    /// Wake word that arms command capture (e.g., "gomez")
    #[arg(short, long)]
    wake_word: Option<String>,

    /// Start listening as soon as the controller is up
    #[arg(long)]
    auto_listen: bool,

    /// Conversation id attached to submitted questions
    #[arg(long)]
    conversation: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice input (manual entry only)
    #[arg(long, env = "VOICE_ASK_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the question prompt (default)
    Run,
    /// Test microphone input and speech segmentation
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Show the resolved configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,voice_ask=info",
        1 => "info,voice_ask=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
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
    match cli.command {
        Some(Command::TestMic { duration }) => {
            let config = load_config(&cli)?;
            test_mic(duration, config.voice.energy_threshold).await
        }
        Some(Command::CheckConfig) => check_config(&cli),
        Some(Command::Run) | None => prompt(&cli).await,
    }
}

/// Load configuration and apply command line overrides
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load_with_options(cli.disable_voice)?;

    if let Some(wake_word) = &cli.wake_word {
        config.input.wake_word.clone_from(wake_word);
    }
    if cli.auto_listen {
        config.input.auto_listen = true;
    }
    if let Some(id) = &cli.conversation {
        config.input.conversation_id = Some(id.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Interactive prompt: voice questions plus typed lines
async fn prompt(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    tracing::debug!(input = ?config.input, "loaded configuration");

    let engine = voice::engine_from_config(&config.voice)
        .map(|engine| Box::new(engine) as Box<dyn SpeechEngine>);
    let voice_enabled = engine.is_some();

    let playback = SharedPlayback::new();
    let (question_tx, mut question_rx) = mpsc::unbounded_channel::<Question>();

    let (handle, task) = voice_ask::spawn(
        config.input.clone(),
        Collaborators {
            engine,
            playback: Arc::new(playback),
            submit: Box::new(question_tx),
        },
    );

    // No answering backend: print the question and report the answer done
    let answers = handle.clone();
    tokio::spawn(async move {
        while let Some(question) = question_rx.recv().await {
            match &question.conversation_id {
                Some(id) => println!("[{id}] ? {}", question.text),
                None => println!("? {}", question.text),
            }
            answers.answer_complete();
        }
    });

    let mut snapshots = handle.subscribe();
    tokio::spawn(async move {
        let mut last = ControllerState::Idle;
        while snapshots.changed().await.is_ok() {
            let state = snapshots.borrow_and_update().state;
            if state != last {
                tracing::info!(%state, "input state");
                last = state;
            }
        }
    });

    if voice_enabled {
        println!(
            "Say \"{}\" followed by your question, or type it below.",
            config.input.wake_word
        );
        println!("Commands: /mic toggles the microphone, /quit exits.");
    } else {
        println!("Voice input disabled. Type a question and press Enter (/quit exits).");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/mic" => handle.toggle_microphone(),
                    text => handle.send_question(text),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown();
    task.await?;
    Ok(())
}

/// Print the resolved configuration
fn check_config(cli: &Cli) -> anyhow::Result<()> {
    match config_file_path() {
        Some(path) if path.exists() => {
            parse_config_file(&path)?;
            println!("Config file: {}", path.display());
        }
        Some(path) => println!("Config file: {} (not found, using defaults)", path.display()),
        None => println!("Config file: unavailable (no home directory)"),
    }

    let config = load_config(cli)?;
    let input = &config.input;
    let voice = &config.voice;

    println!("\n[input]");
    println!("  wake_word        = {}", input.wake_word);
    println!("  silence_timeout  = {} ms", input.silence_timeout.as_millis());
    println!("  submit_delay     = {} ms", input.submit_delay.as_millis());
    println!("  auto_listen      = {}", input.auto_listen);
    println!("  clear_on_send    = {}", input.clear_on_send);
    println!(
        "  conversation_id  = {}",
        input.conversation_id.as_deref().unwrap_or("-")
    );

    println!("\n[voice]");
    println!("  enabled          = {}", voice.enabled);
    println!("  stt_url          = {}", voice.stt_url);
    println!("  stt_model        = {}", voice.stt_model);
    println!("  language         = {}", voice.language.as_deref().unwrap_or("auto"));
    println!(
        "  api_key          = {}",
        if voice.api_key.is_some() { "set" } else { "not set" }
    );
    println!("  energy_threshold = {}", voice.energy_threshold);

    println!("\nConfiguration is valid.");
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64, threshold: f32) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Device: {}", capture.device_name());
    println!("Sample rate: {} Hz", voice::SAMPLE_RATE);
    println!("Speech threshold: {threshold:.4}");
    println!("---");

    let mut segmenter = SpeechSegmenter::new(threshold);
    let mut phrases = 0_usize;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        if segmenter.process(&samples).is_some() {
            phrases += 1;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);
        let marker = if energy > threshold { "speech" } else { "" };

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}] {}",
            i + 1,
            energy,
            peak,
            meter,
            marker
        );
    }

    if segmenter.flush().is_some() {
        phrases += 1;
    }
    capture.stop();

    println!("\n---");
    println!("Phrases detected: {phrases}");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("If RMS moves but no phrases are detected, lower voice.energy_threshold.");

    Ok(())
}
