//! Audio output.
//!
//! A player is handed the encoded clip together with a completion sender;
//! it reports exactly one outcome through that sender when the clip ends or
//! fails. Dropping the sender without a value means playback was stopped.

use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SpeechError;
use crate::wav::wav_duration;

pub type PlaybackOutcome = Result<(), SpeechError>;

/// Controls one clip that is currently playing.
pub trait PlaybackControl: Send {
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
}

pub trait AudioPlayer: Send + Sync {
    /// Start playing `audio`; the outcome is reported through `done`.
    fn play(
        &self,
        audio: Vec<u8>,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, SpeechError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Run,
    Pause,
    Stop,
}

struct TransportControl {
    tx: watch::Sender<Transport>,
}

impl PlaybackControl for TransportControl {
    fn pause(&self) {
        self.tx.send_replace(Transport::Pause);
    }

    fn resume(&self) {
        self.tx.send_replace(Transport::Run);
    }

    fn stop(&self) {
        self.tx.send_replace(Transport::Stop);
    }
}

/// Silent player that keeps time with the clip.
///
/// Validates the WAV data and completes after the clip's duration, honoring
/// pause and resume. Used when no output device is configured.
#[derive(Debug, Default, Clone)]
pub struct ClockPlayer;

impl AudioPlayer for ClockPlayer {
    fn play(
        &self,
        audio: Vec<u8>,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, SpeechError> {
        let duration = wav_duration(&audio)?;
        let (tx, rx) = watch::channel(Transport::Run);
        tokio::spawn(run_clock(duration, rx, done));
        Ok(Box::new(TransportControl { tx }))
    }
}

async fn run_clock(total: Duration, mut control: watch::Receiver<Transport>, done: oneshot::Sender<PlaybackOutcome>) {
    let mut remaining = total;
    loop {
        let state = *control.borrow_and_update();
        match state {
            Transport::Stop => return,
            Transport::Pause => {
                if control.changed().await.is_err() {
                    return;
                }
            }
            Transport::Run => {
                let started = Instant::now();
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => {
                        let _ = done.send(Ok(()));
                        return;
                    }
                    changed = control.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        remaining = remaining.saturating_sub(started.elapsed());
                    }
                }
            }
        }
    }
}

/// Plays clips through an external command-line player such as `aplay`
/// or `afplay`, one temporary WAV file per clip.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Parse a command line like `"aplay -q"`; `None` when blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

enum Next {
    Exited(std::io::Result<std::process::ExitStatus>),
    Control(Option<Transport>),
}

impl AudioPlayer for CommandPlayer {
    fn play(
        &self,
        audio: Vec<u8>,
        done: oneshot::Sender<PlaybackOutcome>,
    ) -> Result<Box<dyn PlaybackControl>, SpeechError> {
        let mut file = tempfile::Builder::new().prefix("speech-").suffix(".wav").tempfile()?;
        file.write_all(&audio)?;
        file.flush()?;

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let pid = child.id();
        debug!("started {} (pid {:?})", self.program, pid);

        let program = self.program.clone();
        let (tx, mut control) = watch::channel(Transport::Run);
        tokio::spawn(async move {
            // keep the clip on disk until the player exits
            let _file = file;
            loop {
                let next = tokio::select! {
                    status = child.wait() => Next::Exited(status),
                    changed = control.changed() => {
                        Next::Control(changed.ok().map(|_| *control.borrow_and_update()))
                    }
                };
                match next {
                    Next::Exited(Ok(status)) if status.success() => {
                        let _ = done.send(Ok(()));
                        return;
                    }
                    Next::Exited(Ok(status)) => {
                        let _ = done.send(Err(SpeechError::Playback(format!("{program} exited with {status}"))));
                        return;
                    }
                    Next::Exited(Err(e)) => {
                        let _ = done.send(Err(e.into()));
                        return;
                    }
                    Next::Control(None | Some(Transport::Stop)) => {
                        let _ = child.kill().await;
                        return;
                    }
                    Next::Control(Some(Transport::Pause)) => signal(pid, "-STOP").await,
                    Next::Control(Some(Transport::Run)) => signal(pid, "-CONT").await,
                }
            }
        });

        Ok(Box::new(TransportControl { tx }))
    }
}

#[cfg(unix)]
async fn signal(pid: Option<u32>, sig: &str) {
    let Some(pid) = pid else { return };
    let result = tokio::process::Command::new("kill")
        .arg(sig)
        .arg(pid.to_string())
        .status()
        .await;
    if let Err(e) = result {
        warn!("could not send {sig} to player {pid}: {e}");
    }
}

#[cfg(not(unix))]
async fn signal(_pid: Option<u32>, sig: &str) {
    warn!("pause/resume ({sig}) is not supported by command players on this platform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::silence;

    #[tokio::test(start_paused = true)]
    async fn test_clock_player_completes_after_duration() {
        let (tx, rx) = oneshot::channel();
        let started = Instant::now();
        let _control = ClockPlayer
            .play(silence(Duration::from_millis(500), 8_000).unwrap(), tx)
            .unwrap();
        rx.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_player_pause_extends_playback() {
        let (tx, rx) = oneshot::channel();
        let started = Instant::now();
        let control = ClockPlayer
            .play(silence(Duration::from_millis(300), 8_000).unwrap(), tx)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        control.pause();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        control.resume();

        rx.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1_300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_player_stop_drops_completion() {
        let (tx, rx) = oneshot::channel();
        let control = ClockPlayer
            .play(silence(Duration::from_millis(300), 8_000).unwrap(), tx)
            .unwrap();
        control.stop();
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_clock_player_rejects_invalid_audio() {
        let (tx, _rx) = oneshot::channel();
        assert!(ClockPlayer.play(b"not a wav".to_vec(), tx).is_err());
    }

    #[test]
    fn test_command_line_parsing() {
        let player = CommandPlayer::from_command_line("aplay -q").unwrap();
        assert_eq!(player.program, "aplay");
        assert_eq!(player.args, vec!["-q".to_string()]);
        assert!(CommandPlayer::from_command_line("   ").is_none());
    }
}
