//! Async adapter from a response byte stream to a stream of text deltas.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::dialect::Dialect;
use crate::frame::{Frame, FrameDecoder};

/// Decode a chunked response body into the non-empty text deltas it carries.
///
/// Deltas are yielded in receive order. Frames that carry no text are
/// skipped, malformed frames are swallowed, and the dialect's end-of-turn
/// sentinel is logged and otherwise ignored; the stream ends when the body
/// ends. A transport error is yielded once and ends the stream.
pub fn decode_deltas<S, E>(dialect: Dialect, byte_stream: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new(dialect.framing());
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for frame in decoder.push(&chunk) {
                if let Some(delta) = interpret(dialect, &frame) {
                    yield Ok(delta);
                }
            }
        }

        for frame in decoder.finish() {
            if let Some(delta) = interpret(dialect, &frame) {
                yield Ok(delta);
            }
        }
    }
}

fn interpret(dialect: Dialect, frame: &Frame) -> Option<String> {
    if dialect.is_terminal(frame) {
        tracing::debug!(?dialect, "end-of-turn marker received");
    }
    dialect.delta(frame).filter(|delta| !delta.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        let owned: Vec<Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        stream::iter(owned)
    }

    async fn collect_ok<S>(s: S) -> Vec<String>
    where
        S: Stream<Item = Result<String, std::io::Error>>,
    {
        s.map(|r| r.expect("unexpected transport error")).collect().await
    }

    #[tokio::test]
    async fn openai_hello_world() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]);
        let deltas = collect_ok(decode_deltas(Dialect::OpenAi, body)).await;
        assert_eq!(deltas.concat(), "Hello world");
    }

    #[tokio::test]
    async fn malformed_frame_between_valid_frames() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {\"choices\":[{\"delta\":\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        ]);
        let deltas = collect_ok(decode_deltas(Dialect::OpenAi, body)).await;
        assert_eq!(deltas, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn anthropic_event_stream() {
        let body = chunks(&[
            "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi \"}}\n\n",
            "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"there\"}}\n\n",
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
        ]);
        let deltas = collect_ok(decode_deltas(Dialect::Anthropic, body)).await;
        assert_eq!(deltas.concat(), "Hi there");
    }

    #[tokio::test]
    async fn unterminated_last_line_is_processed_at_end() {
        let body = chunks(&["data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}"]);
        let deltas = collect_ok(decode_deltas(Dialect::OpenAi, body)).await;
        assert_eq!(deltas, vec!["tail"]);
    }

    #[tokio::test]
    async fn transport_error_is_yielded_once_and_ends_stream() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
            )),
            Err(std::io::Error::other("connection reset")),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\n",
            )),
        ];
        let results: Vec<_> = decode_deltas(Dialect::OpenAi, stream::iter(items))
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_deref().ok(), Some("x"));
        assert!(results[1].is_err());
    }
}
