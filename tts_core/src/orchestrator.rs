//! Sequential speech playback.
//!
//! One actor task owns the speech queue, the playback state, the mute flag
//! and the streaming sentence segmenter. Everything else talks to it through
//! a cloneable [`SpeechHandle`]. At most one unit is fetched or played at a
//! time; later units wait in FIFO order and a failed unit is skipped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SpeechError;
use crate::playback::{AudioPlayer, PlaybackControl, PlaybackOutcome};
use crate::sentence::SentenceSegmenter;
use crate::synth::SpeechSynthesizer;
use crate::text::clean_for_speech;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Fetching,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeechStatus {
    pub state: PlaybackState,
    pub muted: bool,
    /// Units waiting behind the active one.
    pub queued: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    StateChanged(PlaybackState),
    /// Audio for this unit started playing.
    Speaking(String),
    Finished(String),
    Failed { text: String, reason: String },
    /// Discarded because speech is muted.
    Dropped(String),
}

enum Command {
    Speak(String),
    StartStreaming,
    UpdateStreaming(String),
    FinishStreaming,
    Stop,
    Pause,
    Resume,
    ToggleMute,
    Snapshot(oneshot::Sender<SpeechStatus>),
}

enum Internal {
    Fetched {
        ticket: u64,
        result: Result<Vec<u8>, SpeechError>,
    },
    Finished {
        ticket: u64,
        outcome: PlaybackOutcome,
    },
}

enum Stage {
    Fetching(JoinHandle<()>),
    Playing(Box<dyn PlaybackControl>),
}

struct ActiveUnit {
    ticket: u64,
    text: String,
    stage: Stage,
}

/// Cloneable front end of the speech actor.
///
/// All operations are fire-and-forget and are applied in the order they were
/// sent. The actor stops playback and exits once every handle is dropped.
#[derive(Clone)]
pub struct SpeechHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SpeechStatus>,
    events: broadcast::Sender<SpeechEvent>,
}

impl SpeechHandle {
    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("speech actor is gone, command ignored");
        }
    }

    /// Queue `text` for playback, or start it right away when nothing is
    /// active. Dropped while muted.
    pub fn speak(&self, text: impl Into<String>) {
        self.send(Command::Speak(text.into()));
    }

    /// Prepare for a new streamed reply: clears the queue and the sentence
    /// scan. Audio already playing is left alone.
    pub fn start_streaming(&self) {
        self.send(Command::StartStreaming);
    }

    /// Hand over the whole reply received so far; newly completed sentences
    /// are spoken.
    pub fn update_streaming_text(&self, full_text: impl Into<String>) {
        self.send(Command::UpdateStreaming(full_text.into()));
    }

    /// Speak whatever trailing text never formed a full sentence.
    pub fn finish_streaming(&self) {
        self.send(Command::FinishStreaming);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn toggle_mute(&self) {
        self.send(Command::ToggleMute);
    }

    /// Latest published status. May lag behind commands still in flight.
    pub fn status(&self) -> SpeechStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SpeechStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.events.subscribe()
    }

    /// Status after every previously sent command has been applied.
    pub async fn snapshot(&self) -> SpeechStatus {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx));
        match rx.await {
            Ok(status) => status,
            Err(_) => self.status(),
        }
    }
}

pub struct SpeechOrchestrator {
    synth: Arc<dyn SpeechSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    fetch_timeout: Option<Duration>,
    state: PlaybackState,
    muted: bool,
    queue: VecDeque<String>,
    active: Option<ActiveUnit>,
    next_ticket: u64,
    segmenter: SentenceSegmenter,
    internal: mpsc::UnboundedSender<Internal>,
    status: watch::Sender<SpeechStatus>,
    events: broadcast::Sender<SpeechEvent>,
}

impl SpeechOrchestrator {
    /// Start the actor on the current tokio runtime.
    pub fn spawn(
        synth: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        fetch_timeout: Option<Duration>,
    ) -> SpeechHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SpeechStatus::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = SpeechOrchestrator {
            synth,
            player,
            fetch_timeout,
            state: PlaybackState::Idle,
            muted: false,
            queue: VecDeque::new(),
            active: None,
            next_ticket: 0,
            segmenter: SentenceSegmenter::new(),
            internal: internal_tx,
            status: status_tx,
            events: events.clone(),
        };
        tokio::spawn(actor.run(command_rx, internal_rx));

        SpeechHandle {
            commands: command_tx,
            status: status_rx,
            events,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = internal.recv() => self.handle_internal(event),
            }
            self.publish();
        }
        self.stop();
        debug!("speech orchestrator shut down");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Speak(text) => self.speak(text),
            Command::StartStreaming => {
                self.segmenter.reset();
                self.queue.clear();
            }
            Command::UpdateStreaming(full) => {
                for sentence in self.segmenter.update(&full) {
                    self.speak(sentence);
                }
            }
            Command::FinishStreaming => {
                if let Some(rest) = self.segmenter.finish() {
                    self.speak(rest);
                }
            }
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::ToggleMute => {
                self.muted = !self.muted;
                info!("speech {}", if self.muted { "muted" } else { "unmuted" });
                if self.muted {
                    self.stop();
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.current_status());
            }
        }
    }

    fn handle_internal(&mut self, event: Internal) {
        match event {
            Internal::Fetched { ticket, result } => {
                let Some(active) = self.take_active(ticket, false) else {
                    debug!("ignoring stale fetch result #{ticket}");
                    return;
                };
                match result {
                    Ok(audio) => self.start_playback(active.ticket, active.text, audio),
                    Err(e) => self.fail(active.text, e),
                }
            }
            Internal::Finished { ticket, outcome } => {
                let Some(active) = self.take_active(ticket, true) else {
                    debug!("ignoring stale playback result #{ticket}");
                    return;
                };
                match outcome {
                    Ok(()) => {
                        debug!("finished speaking: {}", active.text);
                        self.emit(SpeechEvent::Finished(active.text));
                        self.set_state(PlaybackState::Idle);
                        self.advance();
                    }
                    Err(e) => self.fail(active.text, e),
                }
            }
        }
    }

    /// Take the active unit if it matches `ticket` and stage.
    fn take_active(&mut self, ticket: u64, playing: bool) -> Option<ActiveUnit> {
        let current = self.active.as_ref()?;
        let stage_matches = match current.stage {
            Stage::Fetching(_) => !playing,
            Stage::Playing(_) => playing,
        };
        if current.ticket == ticket && stage_matches {
            self.active.take()
        } else {
            None
        }
    }

    fn speak(&mut self, text: String) {
        if self.muted {
            debug!("muted, dropping: {text}");
            self.emit(SpeechEvent::Dropped(text));
            return;
        }
        self.queue.push_back(text);
        if self.active.is_none() {
            self.advance();
        }
    }

    /// Start the next queued unit that has anything speakable in it.
    fn advance(&mut self) {
        while self.active.is_none() {
            let Some(text) = self.queue.pop_front() else {
                return;
            };
            let cleaned = clean_for_speech(&text);
            if cleaned.is_empty() {
                debug!("nothing speakable in {text:?}, skipping");
                continue;
            }
            self.start_fetch(cleaned);
        }
    }

    fn start_fetch(&mut self, text: String) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        let synth = Arc::clone(&self.synth);
        let internal = self.internal.clone();
        let timeout = self.fetch_timeout;
        let input = text.clone();
        let task = tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, synth.synthesize(&input))
                    .await
                    .unwrap_or(Err(SpeechError::Timeout(limit))),
                None => synth.synthesize(&input).await,
            };
            let _ = internal.send(Internal::Fetched { ticket, result });
        });

        self.active = Some(ActiveUnit {
            ticket,
            text,
            stage: Stage::Fetching(task),
        });
        self.set_state(PlaybackState::Fetching);
    }

    fn start_playback(&mut self, ticket: u64, text: String, audio: Vec<u8>) {
        let (done_tx, done_rx) = oneshot::channel();
        let control = match self.player.play(audio, done_tx) {
            Ok(control) => control,
            Err(e) => return self.fail(text, e),
        };

        let internal = self.internal.clone();
        tokio::spawn(async move {
            let outcome = done_rx
                .await
                .unwrap_or_else(|_| Err(SpeechError::Playback("player ended without reporting".to_string())));
            let _ = internal.send(Internal::Finished { ticket, outcome });
        });

        debug!("speaking: {text}");
        self.emit(SpeechEvent::Speaking(text.clone()));
        self.active = Some(ActiveUnit {
            ticket,
            text,
            stage: Stage::Playing(control),
        });
        self.set_state(PlaybackState::Playing);
    }

    fn fail(&mut self, text: String, error: SpeechError) {
        warn!("speech failed for {text:?}: {error}");
        self.emit(SpeechEvent::Failed {
            text,
            reason: error.to_string(),
        });
        self.set_state(PlaybackState::Idle);
        self.advance();
    }

    fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(ActiveUnit { stage: Stage::Playing(control), .. }) = &self.active {
            control.pause();
            self.set_state(PlaybackState::Paused);
        }
    }

    fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        if let Some(ActiveUnit { stage: Stage::Playing(control), .. }) = &self.active {
            control.resume();
            self.set_state(PlaybackState::Playing);
        }
    }

    fn stop(&mut self) {
        self.queue.clear();
        if let Some(active) = self.active.take() {
            match active.stage {
                Stage::Fetching(task) => task.abort(),
                Stage::Playing(control) => control.stop(),
            }
            debug!("stopped: {}", active.text);
        }
        self.set_state(PlaybackState::Idle);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit(SpeechEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: SpeechEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn current_status(&self) -> SpeechStatus {
        SpeechStatus {
            state: self.state,
            muted: self.muted,
            queued: self.queue.len(),
        }
    }

    fn publish(&self) {
        let status = self.current_status();
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}
