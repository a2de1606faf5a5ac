//! Server-sent-events decoding for streamed chat completions.
//!
//! The body of a streamed completion is a series of lines of the form
//! `data: {"choices":[{"delta":{"content":"..."}}]}` terminated by
//! `data: [DONE]`. Decoding is line-oriented: bytes are buffered only until
//! the next newline, so memory stays bounded by the longest single line.
//! Frames that fail to parse are skipped rather than failing the stream.

use std::{future::Future, pin::Pin};

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::TransportError;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Boxed stream of decoded deltas.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<TextDelta, TransportError>> + Send>>;

/// One incremental fragment of assistant text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    pub content: String,
}

impl TextDelta {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Result of interpreting a single SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Delta(TextDelta),
    Done,
    Skip,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Interpret one line of an SSE body.
pub fn parse_line(line: &str) -> Frame {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Frame::Skip;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Skip;
    };
    if payload.trim() == DONE_SENTINEL {
        return Frame::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .map(|content| Frame::Delta(TextDelta { content }))
            .unwrap_or(Frame::Skip),
        Err(e) => {
            tracing::debug!("skipping malformed SSE frame: {e}");
            Frame::Skip
        }
    }
}

/// Splits an incoming byte stream into lines.
///
/// Holds at most one incomplete line between calls. Lines are decoded as
/// UTF-8 only once complete, so multi-byte characters split across network
/// chunks survive intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let raw = &self.pending[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            lines.push(String::from_utf8_lossy(raw).into_owned());
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Take whatever partial line is left once the body has closed.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        let rest = rest.strip_suffix(b"\r").unwrap_or(&rest);
        Some(String::from_utf8_lossy(rest).into_owned())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Decode an SSE response body into a stream of text deltas.
///
/// The stream ends after `[DONE]`, or when the body closes (after decoding
/// any trailing partial line). A body error is yielded once as `Err` and ends
/// the stream; deltas yielded before it stand.
pub fn decode_sse<S, E>(body: S) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<TransportError> + Send + 'static,
{
    Box::pin(stream! {
        let body = body;
        futures::pin_mut!(body);

        let mut lines = LineBuffer::default();
        let mut finished = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err::<TextDelta, TransportError>(e.into());
                    finished = true;
                    break 'read;
                }
            };
            for line in lines.push(&chunk) {
                match parse_line(&line) {
                    Frame::Delta(delta) => yield Ok(delta),
                    Frame::Done => {
                        finished = true;
                        break 'read;
                    }
                    Frame::Skip => {}
                }
            }
        }

        if !finished {
            if let Some(line) = lines.finish() {
                if let Frame::Delta(delta) = parse_line(&line) {
                    yield Ok(delta);
                }
            }
        }
    })
}

/// Feed every delta of `stream` to `sink`, one at a time and in order.
///
/// Returns how many deltas were delivered, or the first transport error.
/// Deltas delivered before an error are not rolled back.
pub async fn forward_deltas<F, Fut>(mut stream: DeltaStream, mut sink: F) -> Result<usize, TransportError>
where
    F: FnMut(TextDelta) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut delivered = 0;
    while let Some(delta) = stream.next().await {
        sink(delta?).await;
        delivered += 1;
    }
    Ok(delivered)
}
