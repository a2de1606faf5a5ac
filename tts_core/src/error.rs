use std::time::Duration;

use thiserror::Error;

/// Failures of the fetch-and-play cycle.
///
/// None of these reach the caller of `speak`; the orchestrator logs them and
/// moves on to the next queued unit.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("TTS error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("TTS request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("TTS fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("audio decode error: {0}")]
    Decode(#[from] hound::Error),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
