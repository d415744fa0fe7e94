//! The streaming relay loop.
//!
//! Wraps a [`FragmentStream`] from the upstream into the byte stream written
//! to the client: the start marker, every non-empty fragment in arrival
//! order, then the end marker (or the error marker if the upstream fails).
//! Nothing is buffered; the next fragment is only pulled from the upstream
//! when the HTTP body asks for more.

use std::convert::Infallible;
use std::time::Instant;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, error, info};

use crate::relay::markers::{STREAM_END, STREAM_ERROR, STREAM_START};
use crate::upstream::FragmentStream;

/// Where a relay is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    /// Start marker not yet written.
    Idle,
    /// Forwarding fragments.
    Streaming,
    /// End marker written.
    Completed,
    /// Error marker written.
    Failed,
}

/// Counters reported when the relay finishes.
#[derive(Debug, Clone, Copy)]
pub struct RelayStats {
    pub fragments: usize,
    pub bytes: usize,
    pub started: Instant,
}

/// State machine driving one relayed reply.
pub struct Relay {
    request_id: String,
    fragments: FragmentStream,
    phase: RelayPhase,
    stats: RelayStats,
}

impl Relay {
    pub fn new(request_id: impl Into<String>, fragments: FragmentStream) -> Self {
        Self {
            request_id: request_id.into(),
            fragments,
            phase: RelayPhase::Idle,
            stats: RelayStats {
                fragments: 0,
                bytes: 0,
                started: Instant::now(),
            },
        }
    }

    pub fn phase(&self) -> RelayPhase {
        self.phase
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Produce the next chunk of the response body, or `None` once a
    /// terminal marker has been written.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        loop {
            match self.phase {
                RelayPhase::Idle => {
                    self.phase = RelayPhase::Streaming;
                    return Some(Bytes::from_static(STREAM_START.as_bytes()));
                }
                RelayPhase::Streaming => match self.fragments.next().await {
                    Some(Ok(text)) if text.is_empty() => continue,
                    Some(Ok(text)) => {
                        self.stats.fragments += 1;
                        self.stats.bytes += text.len();
                        return Some(Bytes::from(text));
                    }
                    Some(Err(e)) => {
                        error!(
                            request_id = self.request_id,
                            fragments = self.stats.fragments,
                            "Upstream failed mid-stream: {e}"
                        );
                        self.phase = RelayPhase::Failed;
                        return Some(Bytes::from_static(STREAM_ERROR.as_bytes()));
                    }
                    None => {
                        info!(
                            request_id = self.request_id,
                            fragments = self.stats.fragments,
                            bytes = self.stats.bytes,
                            elapsed_ms = self.stats.started.elapsed().as_millis() as u64,
                            "Stream complete"
                        );
                        self.phase = RelayPhase::Completed;
                        return Some(Bytes::from_static(STREAM_END.as_bytes()));
                    }
                },
                RelayPhase::Completed | RelayPhase::Failed => return None,
            }
        }
    }

    /// Turn the relay into an HTTP body stream.
    pub fn into_body_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        stream::unfold(self, |mut relay| async move {
            let chunk = relay.next_chunk().await?;
            Some((Ok(chunk), relay))
        })
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if matches!(self.phase, RelayPhase::Idle | RelayPhase::Streaming) {
            debug!(
                request_id = self.request_id,
                fragments = self.stats.fragments,
                "Client went away before the stream finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamError;

    fn fragments(items: Vec<Result<&str, UpstreamError>>) -> FragmentStream {
        Box::pin(stream::iter(
            items
                .into_iter()
                .map(|item| item.map(str::to_string))
                .collect::<Vec<_>>(),
        ))
    }

    async fn collect(relay: Relay) -> String {
        let chunks: Vec<_> = relay.into_body_stream().collect().await;
        chunks
            .into_iter()
            .map(|chunk| String::from_utf8(chunk.unwrap().to_vec()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_markers_wrap_fragments() {
        let relay = Relay::new("t1", fragments(vec![Ok("Hola"), Ok(", "), Ok("mundo")]));
        assert_eq!(
            collect(relay).await,
            "[STREAM-START]\nHola, mundo\n[STREAM-END]\n"
        );
    }

    #[tokio::test]
    async fn test_empty_fragments_are_skipped() {
        let mut relay = Relay::new("t2", fragments(vec![Ok(""), Ok("a"), Ok(""), Ok("b")]));

        let mut chunks = Vec::new();
        while let Some(chunk) = relay.next_chunk().await {
            chunks.push(chunk);
        }

        assert_eq!(
            chunks,
            vec![
                Bytes::from_static(b"[STREAM-START]\n"),
                Bytes::from_static(b"a"),
                Bytes::from_static(b"b"),
                Bytes::from_static(b"\n[STREAM-END]\n"),
            ]
        );
        assert_eq!(relay.phase(), RelayPhase::Completed);
        assert_eq!(relay.stats().fragments, 2);
    }

    #[tokio::test]
    async fn test_error_marker_ends_stream() {
        let relay = Relay::new(
            "t3",
            fragments(vec![
                Ok("parcial"),
                Err(UpstreamError::Blocked("SAFETY".to_string())),
                Ok("never sent"),
            ]),
        );
        assert_eq!(
            collect(relay).await,
            "[STREAM-START]\nparcial[STREAM-ERROR]\n"
        );
    }

    #[tokio::test]
    async fn test_empty_reply_still_framed() {
        let mut relay = Relay::new("t4", fragments(vec![]));
        assert_eq!(relay.phase(), RelayPhase::Idle);
        assert_eq!(relay.next_chunk().await.unwrap(), STREAM_START);
        assert_eq!(relay.phase(), RelayPhase::Streaming);
        assert_eq!(relay.next_chunk().await.unwrap(), STREAM_END);
        assert_eq!(relay.next_chunk().await, None);
    }
}
