//! Streaming body capture
//!
//! Bodies are passed through to their consumer chunk by chunk while the first
//! `limit` bytes are copied aside for auditing. Nothing beyond the limit is
//! buffered, and stream errors reach the consumer untouched.

use axum::body::{Body, Bytes};
use futures::{future, stream, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a capture saw of a body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// The first bytes of the body, at most the capture limit
    pub bytes: Vec<u8>,
    /// Total number of bytes that passed through
    pub total: usize,
    /// The body stream ended with an error
    pub failed: bool,
}

impl Captured {
    /// Whether bytes beyond the limit were passed through but not kept
    pub fn truncated(&self) -> bool {
        self.total > self.bytes.len()
    }
}

/// Shared handle to the bytes captured from one body
#[derive(Debug, Clone)]
pub struct BodyCapture {
    limit: usize,
    state: Arc<Mutex<Captured>>,
}

impl BodyCapture {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            state: Arc::new(Mutex::new(Captured::default())),
        }
    }

    /// Wrap `body` so every chunk read from it is recorded
    pub fn wrap(&self, body: Body) -> Body {
        let capture = self.clone();
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            capture.record(&chunk);
            chunk
        }))
    }

    /// Like [`wrap`](Self::wrap), calling `on_complete` once the body has been
    /// read to its end without error
    ///
    /// A body that fails, or is dropped before its end, never completes.
    pub fn wrap_with<F>(&self, body: Body, on_complete: F) -> Body
    where
        F: FnOnce(Captured) + Send + 'static,
    {
        let capture = self.clone();
        let finished = self.clone();

        let completion = stream::once(async move {
            let captured = finished.snapshot();
            if !captured.failed {
                on_complete(captured);
            }
            None::<Result<Bytes, axum::Error>>
        })
        .filter_map(future::ready);

        Body::from_stream(
            body.into_data_stream()
                .map(move |chunk| {
                    capture.record(&chunk);
                    chunk
                })
                .chain(completion),
        )
    }

    /// Everything captured so far
    pub fn snapshot(&self) -> Captured {
        self.lock().clone()
    }

    fn record(&self, chunk: &Result<Bytes, axum::Error>) {
        let mut state = self.lock();
        match chunk {
            Ok(bytes) => {
                state.total += bytes.len();
                let room = self.limit.saturating_sub(state.bytes.len());
                state.bytes.extend_from_slice(&bytes[..room.min(bytes.len())]);
            }
            Err(_) => state.failed = true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::io;

    fn chunked(chunks: Vec<io::Result<&'static str>>) -> Body {
        Body::from_stream(stream::iter(
            chunks
                .into_iter()
                .map(|chunk| chunk.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    #[tokio::test]
    async fn test_body_passes_through_in_full() {
        let capture = BodyCapture::new(4);
        let body = capture.wrap(chunked(vec![Ok("abc"), Ok("defg"), Ok("hij")]));

        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"abcdefghij");

        let captured = capture.snapshot();
        assert_eq!(captured.bytes, b"abcd");
        assert_eq!(captured.total, 10);
        assert!(captured.truncated());
        assert!(!captured.failed);
    }

    #[tokio::test]
    async fn test_stream_error_reaches_consumer() {
        let capture = BodyCapture::new(64);
        let body = capture.wrap(chunked(vec![
            Ok("{\"partial\":"),
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        ]));

        assert!(to_bytes(body, usize::MAX).await.is_err());
        let captured = capture.snapshot();
        assert!(captured.failed);
        assert_eq!(captured.bytes, b"{\"partial\":");
    }

    #[tokio::test]
    async fn test_completion_runs_after_last_chunk() {
        let capture = BodyCapture::new(64);
        let (tx, rx) = std::sync::mpsc::channel();
        let body = capture.wrap_with(chunked(vec![Ok("hello "), Ok("world")]), move |captured| {
            tx.send(captured).unwrap();
        });

        assert!(rx.try_recv().is_err());
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello world");

        let captured = rx.try_recv().unwrap();
        assert_eq!(captured.bytes, b"hello world");
        assert!(!captured.truncated());
    }

    #[tokio::test]
    async fn test_completion_skipped_on_error() {
        let capture = BodyCapture::new(64);
        let (tx, rx) = std::sync::mpsc::channel::<Captured>();
        let body = capture.wrap_with(
            chunked(vec![Ok("part"), Err(io::Error::from(io::ErrorKind::BrokenPipe))]),
            move |captured| {
                tx.send(captured).unwrap();
            },
        );

        assert!(to_bytes(body, usize::MAX).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_zero_limit_keeps_nothing() {
        let capture = BodyCapture::new(0);
        let body = capture.wrap(Body::from("payload"));

        to_bytes(body, usize::MAX).await.unwrap();
        let captured = capture.snapshot();
        assert!(captured.bytes.is_empty());
        assert_eq!(captured.total, 7);
    }
}
