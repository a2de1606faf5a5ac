// Configuration for the companion client

use std::time::Duration;

use llm_core::LlmConfig;
use tts_core::SpeechConfig;

#[derive(Clone, Debug)]
pub struct CompanionConfig {
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    /// Time between two revealed characters.
    pub display_interval_ms: u64,
    pub display_poll_ms: u64,
    pub welcome_delay_ms: u64,
    /// Command line of an external audio player, e.g. `aplay -q`.
    pub audio_player: Option<String>,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            speech: SpeechConfig::default(),
            display_interval_ms: 60,
            display_poll_ms: 10,
            welcome_delay_ms: 500,
            audio_player: None,
        }
    }
}

impl CompanionConfig {
    pub fn from_env() -> Self {
        let display_interval_ms = std::env::var("DISPLAY_CHAR_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let display_poll_ms = std::env::var("DISPLAY_POLL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(10);

        let welcome_delay_ms = std::env::var("WELCOME_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let audio_player = std::env::var("AUDIO_PLAYER")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self {
            llm: LlmConfig::from_env(),
            speech: SpeechConfig::from_env(),
            display_interval_ms,
            display_poll_ms,
            welcome_delay_ms,
            audio_player,
        }
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    pub fn display_poll(&self) -> Duration {
        Duration::from_millis(self.display_poll_ms)
    }

    pub fn welcome_delay(&self) -> Duration {
        Duration::from_millis(self.welcome_delay_ms)
    }
}
