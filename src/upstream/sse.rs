//! Server-sent-event decoding for `alt=sse` replies.
//!
//! Turns a byte stream into the `data:` payloads of each event. Events may
//! be split across network chunks at any byte, including inside a UTF-8
//! character or between the `\r` and `\n` of a CRLF. CRLF, LF and bare CR
//! line endings are accepted.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::text::Utf8Decoder;

/// Incremental SSE frame decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    buffer: String,
    /// A chunk ended on `\r`; it may be the first half of a CRLF.
    pending_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the data payload of every event completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(bytes);
        self.push_text(&text);
        self.drain_events()
    }

    /// Flush a final event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.utf8.finish();
        self.push_text(&rest);
        if std::mem::take(&mut self.pending_cr) {
            self.buffer.push('\n');
        }
        let block = std::mem::take(&mut self.buffer);
        parse_event(&block)
    }

    /// Append decoded text to the buffer with line endings folded to `\n`.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.pending_cr && !text.contains('\r') {
            self.buffer.push_str(text);
            return;
        }

        let mut chunk = String::with_capacity(text.len() + 1);
        if std::mem::take(&mut self.pending_cr) {
            chunk.push('\r');
        }
        chunk.push_str(text);
        if chunk.ends_with('\r') {
            chunk.pop();
            self.pending_cr = true;
        }
        self.buffer
            .push_str(&chunk.replace("\r\n", "\n").replace('\r', "\n"));
    }

    fn drain_events(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = parse_event(&block) {
                events.push(data);
            }
        }
        events
    }
}

/// Join the `data:` lines of one event block. Comments and other fields
/// are ignored; a block without data yields nothing.
fn parse_event(block: &str) -> Option<String> {
    let mut data: Option<String> = None;
    for line in block.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    data
}

struct DecodeState<E> {
    body: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

/// Decode a byte stream into a stream of SSE data payloads.
///
/// A transport error is yielded once and ends the stream.
pub fn decode_stream<S, E>(body: S) -> impl Stream<Item = Result<String, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.ready.pop_front() {
                return Some((Ok(data), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.ready.extend(events);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
}
