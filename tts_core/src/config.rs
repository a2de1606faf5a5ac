// Configuration for speech synthesis and playback

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub speed: f32,
    pub response_format: String,
    pub fetch_timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "tts-1".to_string(),
            voice: "nova".to_string(), // warm and cheerful
            speed: 1.0,
            response_format: "wav".to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let model = std::env::var("TTS_MODEL").unwrap_or(defaults.model);
        let voice = std::env::var("TTS_VOICE").unwrap_or(defaults.voice);

        let speed = std::env::var("TTS_SPEED")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|s: &f32| (0.25..=4.0).contains(s))
            .unwrap_or(defaults.speed);

        let fetch_timeout_secs = std::env::var("TTS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fetch_timeout_secs);

        Self {
            api_key,
            base_url,
            model,
            voice,
            speed,
            response_format: defaults.response_format,
            fetch_timeout_secs,
        }
    }

    pub fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }

    /// `None` disables the timeout.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }
}
