// Configuration for the chat-completions client

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for memory recall. \
Help users remember their memories in a warm, supportive way. Be gentle and encouraging.";

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            request_timeout_secs: 60,
            stream_idle_timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();

        let base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let model = std::env::var("LLM_MODEL").unwrap_or(defaults.model);

        let temperature = std::env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.temperature);

        // An explicitly empty prompt disables the system message.
        let system_prompt = match std::env::var("LLM_SYSTEM_PROMPT") {
            Ok(p) if p.trim().is_empty() => None,
            Ok(p) => Some(p),
            Err(_) => defaults.system_prompt,
        };

        let request_timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let stream_idle_timeout_secs = std::env::var("LLM_STREAM_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.stream_idle_timeout_secs);

        Self {
            api_key,
            base_url,
            model,
            temperature,
            system_prompt,
            request_timeout_secs,
            stream_idle_timeout_secs,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// `None` disables the timeout.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Longest gap allowed between two body chunks. `None` waits forever.
    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_secs > 0).then(|| Duration::from_secs(self.stream_idle_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seconds_disables_timeouts() {
        let config = LlmConfig {
            request_timeout_secs: 0,
            stream_idle_timeout_secs: 0,
            ..LlmConfig::default()
        };
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.stream_idle_timeout(), None);

        let defaults = LlmConfig::default();
        assert_eq!(defaults.request_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(defaults.stream_idle_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_chat_url_ignores_trailing_slash() {
        let config = LlmConfig::default().with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.chat_url(), "http://localhost:8080/v1/chat/completions");
    }
}
