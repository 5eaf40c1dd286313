//! Streamed Response Decoding
//!
//! The upstream delivers its body as opaque byte chunks framed as
//! `data: {json}` event lines. One chunk may carry zero, one, or several
//! complete lines, and a line may itself span two chunks, so the decoder
//! buffers the trailing fragment across chunk boundaries and only ever
//! parses complete lines. Buffering happens at the byte level: a
//! multi-byte character split across chunks is reassembled before any text
//! decoding, and line splitting on the `\n` byte can never land inside one.

use crate::error::PipelineError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

/// One decoded increment from the response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Intermediate "thinking" text from the model.
    Reasoning(String),
    /// Final-answer text.
    Content(String),
}

impl StreamEvent {
    pub fn delta(&self) -> &str {
        match self {
            StreamEvent::Reasoning(delta) | StreamEvent::Content(delta) => delta,
        }
    }
}

/// Fully assembled channels after the stream ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamText {
    pub reasoning: String,
    pub content: String,
}

/// Incremental event-line decoder.
///
/// Owns all of its buffering state, so concurrent calls each construct
/// their own decoder and never share accumulators.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    text: StreamText,
    done: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk, invoking `on_event` once per non-empty
    /// delta, in arrival order.
    pub fn feed<F: FnMut(StreamEvent)>(&mut self, chunk: &[u8], on_event: &mut F) {
        if self.done {
            return;
        }
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim_end_matches(['\n', '\r']), on_event);
            if self.done {
                return;
            }
        }
    }

    /// Finish decoding. An unterminated trailing line is discarded, never
    /// guessed at.
    pub fn finish(self) -> StreamText {
        self.text
    }

    fn process_line<F: FnMut(StreamEvent)>(&mut self, line: &str, on_event: &mut F) {
        // Lines without the event prefix are keep-alives or framing we do
        // not know; skip them rather than fail the stream.
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        let payload = rest.trim();
        if payload == DONE_MARKER {
            self.done = true;
            return;
        }
        let Ok(frame) = serde_json::from_str::<StreamFrame>(payload) else {
            return;
        };
        let Some(delta) = frame.choices.into_iter().next().map(|choice| choice.delta) else {
            return;
        };

        if let Some(reasoning) = delta.reasoning_content.filter(|d| !d.is_empty()) {
            self.text.reasoning.push_str(&reasoning);
            on_event(StreamEvent::Reasoning(reasoning));
        }
        if let Some(content) = delta.content.filter(|d| !d.is_empty()) {
            self.text.content.push_str(&content);
            on_event(StreamEvent::Content(content));
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Drive a byte stream through a decoder to completion.
///
/// An `Err` chunk (timeout firing mid-stream, transport reset) aborts the
/// read and propagates; the partial accumulators are dropped with the
/// decoder.
pub async fn decode<S, F>(mut stream: S, mut on_event: F) -> Result<StreamText, PipelineError>
where
    S: Stream<Item = Result<Bytes, PipelineError>> + Unpin,
    F: FnMut(StreamEvent),
{
    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = stream.next().await {
        decoder.feed(&chunk?, &mut on_event);
    }
    Ok(decoder.finish())
}
