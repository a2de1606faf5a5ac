pub mod config;
pub mod error;
pub mod sse;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::{debug, info};

pub use config::LlmConfig;
pub use error::{FailureCategory, TransportError};
pub use sse::{decode_sse, forward_deltas, DeltaStream, TextDelta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Structure for the OpenAI Chat API request
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<&'a Message>,
    temperature: f32,
    stream: bool,
}

/// Structure for the OpenAI Chat API response
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

/// Anything that can turn a conversation into a stream of assistant deltas.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn stream_chat(&self, messages: &[Message]) -> Result<DeltaStream, TransportError>;
}

pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
    system: Option<Message>,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;
        let system = config
            .system_prompt
            .as_ref()
            .map(|prompt| Message::new(Role::System, prompt.clone()));
        Ok(Self {
            client,
            config,
            system,
        })
    }

    /// Create a client from `OPENAI_API_KEY` and the other `LLM_*` variables.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::new(LlmConfig::from_env())
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send the conversation and return the whole reply at once.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, TransportError> {
        let response = self.send(messages, false).await?;
        let body = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("chat response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| TransportError::InvalidResponse("No response from API".to_string()))
    }

    async fn send(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response, TransportError> {
        let req_body = ChatRequest {
            model: &self.config.model,
            messages: self.system.iter().chain(messages.iter()).collect(),
            temperature: self.config.temperature,
            stream,
        };

        debug!(
            "chat request: model={}, messages={}, stream={}",
            self.config.model,
            req_body.messages.len(),
            stream
        );

        let request = self
            .client
            .post(self.config.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(&req_body)
            .send();

        let response = match self.config.request_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, request)
                .await
                .map_err(|_| TransportError::Timeout(timeout))??,
            None => request.await?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = TransportError::from_error_body(status.as_u16(), &body);
            tracing::warn!("chat request failed: {err}");
            return Err(err);
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatTransport for OpenAiClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<DeltaStream, TransportError> {
        let response = self.send(messages, true).await?;
        info!("chat stream opened ({})", response.status());

        let Some(idle) = self.config.stream_idle_timeout() else {
            return Ok(decode_sse(response.bytes_stream()));
        };
        let body = response.bytes_stream().timeout(idle).map(move |item| match item {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(TransportError::from(e)),
            Err(_) => Err(TransportError::Timeout(idle)),
        });
        Ok(decode_sse(body))
    }
}
