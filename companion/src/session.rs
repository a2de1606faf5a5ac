use std::future::ready;
use std::sync::Arc;

use llm_core::{forward_deltas, ChatTransport, Message, Role, TransportError};
use tracing::{debug, info};
use tts_core::SpeechHandle;
use uuid::Uuid;

use crate::buffer::StreamBuffer;
use crate::conversation::{ChatMessage, Conversation};
use crate::error::ChatError;
use crate::pacer::{DisplayPacer, DisplaySink};
use crate::validation::validate_message;

/// One chat with the companion: transcript, transport and voice.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    speech: SpeechHandle,
    pacer: DisplayPacer,
    conversation: Conversation,
    /// Placeholder of the reply being streamed, if any.
    streaming: Option<Uuid>,
}

/// Stops speech if a reply is abandoned halfway.
struct AbandonGuard {
    speech: SpeechHandle,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("reply abandoned, stopping speech");
            self.speech.stop();
        }
    }
}

impl ChatSession {
    /// Start a session that opens with the welcome message.
    pub fn new(transport: Arc<dyn ChatTransport>, speech: SpeechHandle, pacer: DisplayPacer) -> Self {
        Self {
            transport,
            speech,
            pacer,
            conversation: Conversation::with_welcome(),
            streaming: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn speech(&self) -> &SpeechHandle {
        &self.speech
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Drop the placeholder left behind by a cancelled reply.
    pub fn discard_interrupted(&mut self) {
        if let Some(id) = self.streaming.take() {
            self.conversation.remove(id);
            debug!("removed interrupted reply {id}");
        }
    }

    /// Send `text`, stream the reply into `display` and speak it sentence by
    /// sentence. Returns the id of the finished assistant message.
    ///
    /// On a transport failure the placeholder is replaced by one error
    /// message in the transcript and the error is returned. Dropping the
    /// future cancels the reply and stops speech.
    pub async fn send_message(&mut self, text: &str, display: Arc<dyn DisplaySink>) -> Result<Uuid, ChatError> {
        validate_message(text)?;
        self.discard_interrupted();

        self.conversation.push(ChatMessage::new(Role::User, text.trim()));
        let history = self.conversation.history();
        let id = self.conversation.push_placeholder();
        self.streaming = Some(id);

        self.speech.start_streaming();
        let buffer = StreamBuffer::new();
        let mut pacer = self.pacer.spawn(buffer.reader(), display);
        let mut guard = AbandonGuard {
            speech: self.speech.clone(),
            armed: true,
        };

        let result = self.stream_reply(&history, &buffer).await;

        match result {
            Ok(deltas) => {
                // flush trailing speech before waiting on the slower display
                self.speech.finish_streaming();
                pacer.wait_caught_up(buffer.char_len()).await;
                pacer.cancel();
                guard.armed = false;

                let reply = buffer.text();
                info!("reply finished: {} deltas, {} chars", deltas, reply.chars().count());
                self.conversation.set_content(id, reply);
                self.streaming = None;
                Ok(id)
            }
            Err(e) => {
                guard.armed = false;
                pacer.cancel();
                self.conversation.remove(id);
                self.streaming = None;

                let err = ChatError::from(e);
                self.conversation.push(ChatMessage::error(err.to_chat_content()));
                Err(err)
            }
        }
    }

    async fn stream_reply(&self, history: &[Message], buffer: &StreamBuffer) -> Result<usize, TransportError> {
        let stream = self.transport.stream_chat(history).await?;
        let speech = &self.speech;
        forward_deltas(stream, |delta| {
            buffer.append(&delta.content);
            speech.update_streaming_text(buffer.text());
            ready(())
        })
        .await
    }
}
