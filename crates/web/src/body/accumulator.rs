//! Buffers a request body chunk by chunk until its end signal.

use crate::ExtractError;
use bytes::{Bytes, BytesMut};
use http_body::Body;
use http_body_util::BodyExt;
use ingest_http::protocol::ParseError;
use tracing::{trace, warn};

/// Collects body chunks in arrival order, refusing to grow past a byte limit.
///
/// The buffer only leaves the accumulator through [`ChunkAccumulator::finish`], which
/// consumes it, so a body is handed out once and never before the caller saw the end signal.
#[derive(Debug)]
pub struct ChunkAccumulator {
    buf: BytesMut,
    limit: usize,
}

impl ChunkAccumulator {
    pub fn new(limit: usize) -> Self {
        Self { buf: BytesMut::new(), limit }
    }

    /// Preallocates for the expected body size, capped at the limit.
    pub fn with_size_hint(limit: usize, size_hint: usize) -> Self {
        Self { buf: BytesMut::with_capacity(size_hint.min(limit)), limit }
    }

    /// Appends a chunk, failing once the running total passes the limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), ExtractError> {
        if self.buf.len() + chunk.len() > self.limit {
            warn!(limit = self.limit, received = self.buf.len() + chunk.len(), "request body exceeds the limit");
            return Err(ExtractError::limit_exceeded(self.limit));
        }

        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads `body` to its end through a [`ChunkAccumulator`].
///
/// A body that declares an exact size above `limit` is refused before any chunk is read.
/// A disconnect in the middle of the body comes back as [`ExtractError::ConnectionAborted`].
pub async fn accumulate<B>(mut body: B, limit: usize) -> Result<Bytes, ExtractError>
where
    B: Body<Data = Bytes, Error = ParseError> + Unpin,
{
    let size_hint = body.size_hint();
    if let Some(declared) = size_hint.exact()
        && declared > limit as u64
    {
        warn!(limit, declared, "declared request body size exceeds the limit");
        return Err(ExtractError::limit_exceeded(limit));
    }

    let lower = usize::try_from(size_hint.lower()).unwrap_or(limit);
    let mut accumulator = ChunkAccumulator::with_size_hint(limit, lower);

    while let Some(frame) = body.frame().await {
        if let Ok(data) = frame?.into_data() {
            accumulator.push(&data)?;
        }
    }

    trace!(size = accumulator.len(), "request body received");
    Ok(accumulator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;
    use http_body::Frame;
    use http_body_util::StreamBody;
    use proptest::prelude::*;

    fn body_of(chunks: Vec<Result<Bytes, ParseError>>) -> impl Body<Data = Bytes, Error = ParseError> + Unpin {
        StreamBody::new(stream::iter(chunks.into_iter().map(|chunk| chunk.map(Frame::data))))
    }

    #[test]
    fn keeps_arrival_order() {
        let mut accumulator = ChunkAccumulator::new(64);
        accumulator.push(b"{\"name\":").unwrap();
        accumulator.push(b"\"John\"}").unwrap();
        assert_eq!(accumulator.len(), 15);
        assert_eq!(accumulator.finish(), Bytes::from_static(b"{\"name\":\"John\"}"));
    }

    #[test]
    fn refuses_to_pass_the_limit() {
        let mut accumulator = ChunkAccumulator::new(8);
        accumulator.push(b"12345").unwrap();
        let result = accumulator.push(b"6789");
        assert!(matches!(result, Err(ExtractError::LimitExceeded { limit: 8 })));
        assert_eq!(accumulator.len(), 5);
    }

    #[test]
    fn exactly_at_the_limit_is_fine() {
        let mut accumulator = ChunkAccumulator::new(4);
        accumulator.push(b"ab").unwrap();
        accumulator.push(b"cd").unwrap();
        assert_eq!(accumulator.finish().len(), 4);
    }

    #[tokio::test]
    async fn aborted_stream_never_yields_a_body() {
        let body = body_of(vec![Ok(Bytes::from_static(b"{\"name\":")), Err(ParseError::connection_aborted(8))]);
        let result = accumulate(body, 1024).await;
        assert!(matches!(result, Err(ExtractError::ConnectionAborted { received: 8 })));
    }

    #[tokio::test]
    async fn streamed_total_over_limit() {
        let body = body_of(vec![Ok(Bytes::from_static(b"aaaa")), Ok(Bytes::from_static(b"bbbb"))]);
        let result = accumulate(body, 6).await;
        assert!(matches!(result, Err(ExtractError::LimitExceeded { limit: 6 })));
    }

    #[tokio::test]
    async fn empty_stream_is_empty_body() {
        let body = body_of(vec![]);
        assert!(accumulate(body, 16).await.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_the_body(
            payload in proptest::collection::vec(any::<u8>(), 0..2048),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..16),
        ) {
            let mut cuts = cuts.iter().map(|index| index.index(payload.len() + 1)).collect::<Vec<_>>();
            cuts.push(0);
            cuts.push(payload.len());
            cuts.sort_unstable();

            let chunks = cuts
                .windows(2)
                .map(|window| Ok(Bytes::copy_from_slice(&payload[window[0]..window[1]])))
                .collect::<Vec<_>>();

            let body = block_on(accumulate(body_of(chunks), 4096)).unwrap();
            prop_assert_eq!(body.as_ref(), payload.as_slice());
        }
    }
}
