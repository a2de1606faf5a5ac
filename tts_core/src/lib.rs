//! Speech side of the companion: sentence segmentation, TTS fetch,
//! playback and the orchestrator that serializes them.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod playback;
pub mod sentence;
pub mod synth;
pub mod text;
pub mod wav;

pub use config::SpeechConfig;
pub use error::SpeechError;
pub use orchestrator::{PlaybackState, SpeechEvent, SpeechHandle, SpeechOrchestrator, SpeechStatus};
pub use playback::{AudioPlayer, ClockPlayer, CommandPlayer, PlaybackControl, PlaybackOutcome};
pub use sentence::SentenceSegmenter;
pub use synth::{OpenAiSpeechClient, SpeechSynthesizer};
