//! Aldin - Voice Interaction Orchestrator
//!
//! Terminal front-end: typed lines are messages, lines starting with `~`
//! are spoken into the console microphone, slash commands drive the controls.

use aldin::asr::{ConsoleMic, ConsoleRecognition, RecognitionBackend};
use aldin::audio::{Overlay, OverlayEngine};
use aldin::config::Config;
use aldin::core::HttpDialogClient;
use aldin::events::{Control, Event, EventSender};
use aldin::presenter::ConsolePresenter;
use aldin::tts::{EspeakEngine, SynthesisBackend};
use aldin::{Backends, Orchestrator};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat server base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Model name sent with every request
    #[arg(long)]
    model: Option<String>,

    /// Start with voice output off
    #[arg(long)]
    no_voice: bool,

    /// Start in wake-word mode
    #[arg(long)]
    wake: bool,

    /// Check that the chat server is reachable and exit
    #[arg(long)]
    check: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };

    if let Some(api_base) = &args.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if args.no_voice {
        config.voice_output = false;
    }
    if args.wake {
        config.wake_on_start = true;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Setup logging
    let level = if args.verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("🤖 Aldin v{} starting...", env!("CARGO_PKG_VERSION"));

    let dialog = Arc::new(HttpDialogClient::new(&config));
    if args.check {
        let ok = dialog.health_check().await;
        if ok {
            info!("✅ Chat server reachable at {}", config.api_base);
            return Ok(());
        }
        anyhow::bail!("chat server not reachable at {}", config.api_base);
    }

    let (recognition, mic) =
        ConsoleRecognition::new(Duration::from_secs(config.no_speech_timeout_secs));
    let recognition: Box<dyn RecognitionBackend> = Box::new(recognition);

    let synthesis: Option<Box<dyn SynthesisBackend>> = match EspeakEngine::detect() {
        Ok(engine) => Some(Box::new(engine)),
        Err(e) => {
            warn!("Voice output disabled: {}", e);
            None
        }
    };

    let overlay: Option<Arc<dyn Overlay>> = if config.overlay_enabled {
        match OverlayEngine::new() {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                warn!("Narration overlay disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let backends = Backends {
        recognition: Some(recognition),
        synthesis,
        overlay,
        dialog,
        presenter: Arc::new(ConsolePresenter::new()),
    };

    let mut orchestrator = Orchestrator::new(&config, backends);
    orchestrator.start();

    let (quit_tx, quit_rx) = oneshot::channel();
    tokio::spawn(read_stdin(orchestrator.sender(), mic, quit_tx));

    info!("✅ Aldin ready - type a message, ~ to speak, or /voice /wake /listen /quit");

    tokio::select! {
        _ = orchestrator.run() => {}
        _ = quit_rx => info!("👋 Bye"),
        _ = tokio::signal::ctrl_c() => info!("👋 Interrupted"),
    }

    Ok(())
}

/// Marks a line as spoken into the console microphone
const SPEECH_PREFIX: char = '~';

/// What one stdin line asks for
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Control(Control),
    /// Heard by the console microphone, if it is listening
    Speech(String),
    Nothing,
}

fn parse_line(line: &str) -> Input {
    match line.trim() {
        "/quit" => Input::Quit,
        "/voice" => Input::Control(Control::ToggleVoiceOutput),
        "/wake" => Input::Control(Control::ToggleWake),
        "/listen" => Input::Control(Control::StartListening),
        "" => Input::Nothing,
        text => match text.strip_prefix(SPEECH_PREFIX) {
            Some(spoken) => Input::Speech(spoken.trim().to_string()),
            None => Input::Control(Control::SubmitText(text.to_string())),
        },
    }
}

/// Turn stdin lines into controls or console speech
async fn read_stdin(events: EventSender, mic: ConsoleMic, quit: oneshot::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };

        let control = match parse_line(&line) {
            Input::Quit => break,
            Input::Nothing => continue,
            Input::Speech(spoken) => {
                if !mic.offer(&spoken) {
                    println!("  (not listening; use /listen or /wake first)");
                }
                continue;
            }
            Input::Control(control) => control,
        };

        if events.send(Event::Control(control)).is_err() {
            break;
        }
    }

    let _ = quit.send(());
}
