use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::error::BoxError;

#[derive(Debug)]
pub(crate) enum BodyError {
    TooLarge,
    Read(BoxError),
}

/// Read a chunked body into one buffer, failing as soon as more than `limit`
/// bytes have arrived. The chunk that crosses the limit is never buffered.
pub(crate) async fn read_bounded<S, E>(body: S, limit: u64) -> Result<Bytes, BodyError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let mut body = std::pin::pin!(body);
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| BodyError::Read(e.into()))?;
        let total = u64::try_from(buf.len() + chunk.len()).unwrap_or(u64::MAX);
        if total > limit {
            return Err(BodyError::TooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn reads_within_limit() {
        let data = read_bounded(chunks(&[b"abc", b"def"]), 6).await.unwrap();
        assert_eq!(&data[..], b"abcdef");
    }

    #[tokio::test]
    async fn empty_body_is_empty() {
        let data = read_bounded(chunks(&[]), 0).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn one_byte_over_is_rejected() {
        let result = read_bounded(chunks(&[b"abc", b"defg"]), 6).await;
        assert!(matches!(result, Err(BodyError::TooLarge)));
    }

    #[tokio::test]
    async fn stops_polling_once_limit_is_crossed() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polled);
        let endless = stream::repeat_with(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Bytes::from_static(&[0u8; 1024]))
        });

        let result = read_bounded(endless, 10 * 1024).await;
        assert!(matches!(result, Err(BodyError::TooLarge)));
        assert_eq!(polled.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn stream_errors_surface_as_read_errors() {
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::other("connection reset")),
        ]);
        match read_bounded(failing, 100).await {
            Err(BodyError::Read(e)) => assert_eq!(e.to_string(), "connection reset"),
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
