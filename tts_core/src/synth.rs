use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::SpeechError;

/// Turns text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'a str,
}

/// Client for an OpenAI-compatible `/audio/speech` endpoint.
pub struct OpenAiSpeechClient {
    client: Client,
    config: SpeechConfig,
}

impl OpenAiSpeechClient {
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let body = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            speed: self.config.speed,
            response_format: &self.config.response_format,
        };

        let response = self
            .client
            .post(self.config.speech_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let audio = response.bytes().await?;
        debug!("fetched {} bytes of audio for {} chars", audio.len(), text.chars().count());
        Ok(audio.to_vec())
    }
}
