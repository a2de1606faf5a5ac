//! Common utilities for integration tests: an in-process mock of the chat
//! and speech endpoints.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use companion::{ChatSession, DisplayPacer, DisplaySink};
use llm_core::{LlmConfig, OpenAiClient};
use tokio::net::TcpListener;
use tts_core::{ClockPlayer, OpenAiSpeechClient, SpeechConfig, SpeechOrchestrator};

#[derive(Clone, Default)]
pub struct Backend {
    pub chunks: Vec<String>,
    pub failure: Option<(u16, String)>,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

pub fn frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

async fn chat_handler(State(backend): State<Backend>) -> Response {
    if let Some((status, text)) = backend.failure.clone() {
        return (StatusCode::from_u16(status).unwrap(), text).into_response();
    }
    let chunks = backend
        .chunks
        .clone()
        .into_iter()
        .map(Ok::<_, std::io::Error>);
    Response::builder()
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .unwrap()
}

async fn speech_handler(State(backend): State<Backend>, Json(body): Json<serde_json::Value>) -> Response {
    let input = body["input"].as_str().unwrap_or_default().to_string();
    backend.spoken.lock().unwrap().push(input);
    let audio = tts_core::wav::silence(Duration::from_millis(50), 8_000).unwrap();
    ([("content-type", "audio/wav")], audio).into_response()
}

pub async fn spawn_backend(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_handler))
        .route("/v1/audio/speech", post(speech_handler))
        .with_state(backend);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A session wired to the mock backend with a fast display and silent playback.
pub fn session_for(addr: SocketAddr) -> ChatSession {
    let base_url = format!("http://{addr}/v1");
    let llm = LlmConfig::default()
        .with_api_key("sk-test")
        .with_base_url(base_url.clone());
    let speech_config = SpeechConfig {
        api_key: "sk-test".to_string(),
        base_url,
        ..SpeechConfig::default()
    };

    let transport = Arc::new(OpenAiClient::new(llm).expect("chat client"));
    let synth = Arc::new(OpenAiSpeechClient::new(speech_config).expect("speech client"));
    let speech = SpeechOrchestrator::spawn(synth, Arc::new(ClockPlayer), Some(Duration::from_secs(5)));
    let pacer = DisplayPacer::new(Duration::from_millis(1), Duration::from_millis(1));
    ChatSession::new(transport, speech, pacer)
}

#[derive(Default)]
pub struct RecordingDisplay {
    pub shown: Mutex<Vec<String>>,
}

impl DisplaySink for RecordingDisplay {
    fn show(&self, text: &str) {
        self.shown.lock().unwrap().push(text.to_string());
    }
}
