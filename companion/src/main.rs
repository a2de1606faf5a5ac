use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use companion::validation::validate_api_key;
use companion::{ChatError, ChatSession, CompanionConfig, DisplayPacer, DisplaySink, WELCOME_MESSAGE};
use llm_core::OpenAiClient;
use tts_core::{AudioPlayer, ClockPlayer, CommandPlayer, OpenAiSpeechClient, PlaybackState, SpeechHandle, SpeechOrchestrator};

/// Prints only what was revealed since the last call.
#[derive(Default)]
struct TerminalDisplay {
    printed: AtomicUsize,
}

impl DisplaySink for TerminalDisplay {
    fn show(&self, text: &str) {
        let start = self.printed.swap(text.len(), Ordering::Relaxed);
        if let Some(new) = text.get(start..) {
            print!("{new}");
            let _ = std::io::stdout().flush();
        }
    }
}

enum Turn {
    Done(Result<uuid::Uuid, ChatError>),
    Cancelled,
}

fn prompt() {
    print!("you> ");
    let _ = std::io::stdout().flush();
}

async fn print_status(speech: &SpeechHandle) {
    let status = speech.snapshot().await;
    let state = match status.state {
        PlaybackState::Idle => "idle",
        PlaybackState::Fetching => "fetching",
        PlaybackState::Playing => "playing",
        PlaybackState::Paused => "paused",
    };
    println!(
        "(voice {}, {} queued{})",
        state,
        status.queued,
        if status.muted { ", muted" } else { "" }
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env if present
    let _ = dotenv::dotenv();

    let config = CompanionConfig::from_env();
    if let Err(e) = validate_api_key(&config.llm.api_key) {
        eprintln!("{}{}", e, e.help_text());
        return Err(e.into());
    }

    let transport = Arc::new(OpenAiClient::new(config.llm.clone()).context("failed to build chat client")?);
    let synth = Arc::new(OpenAiSpeechClient::new(config.speech.clone()).context("failed to build speech client")?);
    let player: Arc<dyn AudioPlayer> = match config.audio_player.as_deref().and_then(CommandPlayer::from_command_line) {
        Some(player) => {
            info!("playing speech through {:?}", player);
            Arc::new(player)
        }
        None => {
            info!("AUDIO_PLAYER not set, speech is timed but silent");
            Arc::new(ClockPlayer)
        }
    };
    let speech = SpeechOrchestrator::spawn(synth, player, config.speech.fetch_timeout());
    let pacer = DisplayPacer::new(config.display_interval(), config.display_poll());
    let mut session = ChatSession::new(transport, speech.clone(), pacer);

    info!(
        "companion ready (model {}, voice {})",
        config.llm.model, config.speech.voice
    );

    let mut events = speech.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!("speech event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => debug!("missed {skipped} speech events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("companion> {WELCOME_MESSAGE}");
    println!("(commands: /mute /pause /resume /stop /status /transcript /quit)");
    let welcome = speech.clone();
    let delay = config.welcome_delay();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        welcome.speak(WELCOME_MESSAGE);
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/mute" => {
                speech.toggle_mute();
                print_status(&speech).await;
                continue;
            }
            "/pause" => {
                speech.pause();
                print_status(&speech).await;
                continue;
            }
            "/resume" => {
                speech.resume();
                print_status(&speech).await;
                continue;
            }
            "/stop" => {
                speech.stop();
                print_status(&speech).await;
                continue;
            }
            "/status" => {
                print_status(&speech).await;
                continue;
            }
            "/transcript" => {
                println!("{}", serde_json::to_string_pretty(session.conversation())?);
                continue;
            }
            _ => {}
        }

        print!("companion> ");
        let display = Arc::new(TerminalDisplay::default());
        let turn = tokio::select! {
            result = session.send_message(input, display) => Turn::Done(result),
            _ = tokio::signal::ctrl_c() => Turn::Cancelled,
        };
        println!();

        match turn {
            Turn::Done(Ok(_)) => {}
            Turn::Done(Err(ChatError::InvalidInput(msg))) => println!("({msg})"),
            Turn::Done(Err(_)) => {
                if let Some(message) = session.conversation().messages().last() {
                    println!("{}", message.content);
                }
            }
            Turn::Cancelled => {
                session.discard_interrupted();
                println!("(response cancelled)");
            }
        }
    }

    speech.stop();
    info!("goodbye");
    Ok(())
}
