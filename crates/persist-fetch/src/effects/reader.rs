use bytes::{Buf, Bytes};
use futures_util::StreamExt;

use super::http::BodyStream;
use crate::error::TransportError;

/// Re-chunks a response body into pieces of at most `max` bytes, dropping
/// any leading bytes that are already on disk.
pub(crate) struct ChunkReader {
    body:    BodyStream,
    pending: Bytes,
    skip:    u64,
}

impl ChunkReader {
    pub(crate) fn new(body: BodyStream, skip: u64) -> Self {
        Self {
            body,
            pending: Bytes::new(),
            skip,
        }
    }

    /// Next chunk of the body.
    ///
    /// `Ok(None)` is the end of the body and `Ok(Some(empty))` an empty frame;
    /// whether either is acceptable is the caller's call. Cancel safe: the only
    /// await is on the body stream itself.
    pub(crate) async fn next_chunk(&mut self, max: usize) -> Result<Option<Bytes>, TransportError> {
        loop {
            if !self.pending.is_empty() {
                let take = max.min(self.pending.len());
                return Ok(Some(self.pending.split_to(take)));
            }

            let mut frame = match self.body.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(e),
                Some(Ok(frame)) => frame,
            };
            if frame.is_empty() {
                return Ok(Some(frame));
            }

            if self.skip > 0 {
                let dropped = self.skip.min(frame.len() as u64);
                frame.advance(dropped as usize);
                self.skip -= dropped;
                if frame.is_empty() {
                    continue;
                }
            }
            self.pending = frame;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(frames: Vec<Result<&'static str, TransportError>>) -> BodyStream {
        Box::pin(stream::iter(
            frames
                .into_iter()
                .map(|f| f.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    async fn drain(reader: &mut ChunkReader, max: usize) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        while let Ok(Some(chunk)) = reader.next_chunk(max).await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_splits_large_frames() {
        let mut reader = ChunkReader::new(body(vec![Ok("abcdefg"), Ok("hi")]), 0);
        let chunks = drain(&mut reader, 3).await;
        assert_eq!(chunks, vec![
            Bytes::from_static(b"abc"),
            Bytes::from_static(b"def"),
            Bytes::from_static(b"g"),
            Bytes::from_static(b"hi"),
        ]);
    }

    #[tokio::test]
    async fn test_skips_prefix_across_frames() {
        let mut reader = ChunkReader::new(body(vec![Ok("abc"), Ok("defg"), Ok("hij")]), 5);
        let chunks = drain(&mut reader, 16).await;
        assert_eq!(chunks, vec![Bytes::from_static(b"fg"), Bytes::from_static(b"hij")]);
    }

    #[tokio::test]
    async fn test_surfaces_errors_and_empty_frames() {
        let mut reader = ChunkReader::new(
            body(vec![Ok("ab"), Ok(""), Err(TransportError::body("reset"))]),
            0,
        );
        assert_eq!(reader.next_chunk(8).await, Ok(Some(Bytes::from_static(b"ab"))));
        assert_eq!(reader.next_chunk(8).await, Ok(Some(Bytes::new())));
        assert_eq!(reader.next_chunk(8).await, Err(TransportError::body("reset")));
    }

    #[tokio::test]
    async fn test_end_of_body() {
        let mut reader = ChunkReader::new(body(vec![]), 0);
        assert_eq!(reader.next_chunk(8).await, Ok(None));
    }
}
