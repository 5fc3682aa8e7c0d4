//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! With `alt=sse` the provider answers a streaming call with one `data:` event
//! per response chunk.  This module turns the raw byte stream into parsed
//! [`GenerateContentResponse`] chunks.  Bytes are buffered until a whole event
//! has arrived and only then decoded, so a multi-byte character split across
//! two network reads is reassembled correctly.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::client::ApiErrorBody;
use crate::observability::STREAM_BYTES;
use crate::{Error, GenerateContentResponse, Result};

/// Process a stream of bytes into a stream of response chunks.
///
/// Events without a `data:` field, comment lines and `[DONE]` markers are
/// skipped.  An error envelope inside the stream becomes an `Err` item.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, false),
        move |(mut stream, mut buffer, mut done)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some((start, len)) = find_event_boundary(&buffer) {
                    let event = decode_event(&buffer[..start]);
                    buffer.drain(..start + len);
                    match event {
                        Some(event) => return Some((event, (stream, buffer, done))),
                        None => continue,
                    }
                }

                if done {
                    return None;
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, done)));
                    }
                    None => {
                        // End of stream; flush a final event that lacks its blank line.
                        done = true;
                        let rest = std::mem::take(&mut buffer);
                        if let Some(event) = decode_event(&rest) {
                            return Some((event, (stream, buffer, done)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Finds the first blank line, returning its offset and length.
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buffer, b"\n\n").map(|at| (at, 2));
    let crlf = find(buffer, b"\r\n\r\n").map(|at| (at, 4));
    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(if lf.0 <= crlf.0 { lf } else { crlf }),
        (lf, crlf) => lf.or(crlf),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Decodes one event.  `None` means there was nothing to deliver.
fn decode_event(raw: &[u8]) -> Option<Result<GenerateContentResponse>> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => return Some(Err(e.into())),
    };

    let mut data: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    if data.is_empty() {
        return None;
    }

    let data = data.join("\n");
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(parse_payload(data))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StreamPayload {
    Error { error: ApiErrorBody },
    Chunk(GenerateContentResponse),
}

fn parse_payload(data: &str) -> Result<GenerateContentResponse> {
    match serde_json::from_str::<StreamPayload>(data) {
        Ok(StreamPayload::Chunk(chunk)) => Ok(chunk),
        Ok(StreamPayload::Error { error }) => Err(error.into_error(None)),
        Err(e) => Err(Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    const HELLO: &[u8] =
        br#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}]}"#;

    fn event(body: &[u8], terminator: &[u8]) -> Vec<u8> {
        let mut out = body.to_vec();
        out.extend_from_slice(terminator);
        out
    }

    #[tokio::test]
    async fn parse_single_chunk() {
        let data = event(HELLO, b"\r\n\r\n");
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut sse_stream = Box::pin(process_sse(stream));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text(), "Hello");
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_multiple_events() {
        let mut data = event(HELLO, b"\n\n");
        data.extend(event(
            br#"data: {"candidates":[{"content":{"parts":[{"text":" world"}]},"finishReason":"STOP"}]}"#,
            b"\n\n",
        ));
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut sse_stream = Box::pin(process_sse(stream));
        let first = sse_stream.next().await.unwrap().unwrap();
        let second = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(first.text(), "Hello");
        assert_eq!(second.text(), " world");
        assert!(second.finish_reason().is_some());
    }

    #[tokio::test]
    async fn handle_split_event() {
        // Simulate an event split across multiple chunks
        let data = event(HELLO, b"\r\n\r\n");
        let (head, tail) = data.split_at(17);
        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
        ]));

        let mut sse_stream = Box::pin(process_sse(stream));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text(), "Hello");
    }

    #[tokio::test]
    async fn handle_split_multibyte_character() {
        let data = event(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"caf\u{e9}\"}]}}]}".as_bytes(),
            b"\n\n",
        );
        let split = data.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let (head, tail) = data.split_at(split);
        let stream = Box::pin(stream::iter(vec![
            Ok(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
        ]));

        let mut sse_stream = Box::pin(process_sse(stream));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text(), "caf\u{e9}");
    }

    #[tokio::test]
    async fn skip_comments_and_empty_events() {
        let mut data = b": keep-alive\n\n".to_vec();
        data.extend(event(HELLO, b"\n\n"));
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut sse_stream = Box::pin(process_sse(stream));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text(), "Hello");
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn flush_unterminated_final_event() {
        let data = HELLO.to_vec();
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut sse_stream = Box::pin(process_sse(stream));
        let chunk = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text(), "Hello");
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let data = b"data: {not json\n\n".to_vec();
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap();
        assert!(matches!(event, Err(Error::Serialization { .. })));
    }

    #[tokio::test]
    async fn error_envelope_becomes_error() {
        let data = br#"data: {"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}

"#
        .to_vec();
        let stream = Box::pin(stream::once(async move { Ok(Bytes::from(data)) }));

        let mut sse_stream = Box::pin(process_sse(stream));
        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert!(err.is_rate_limit());
        assert!(err.to_string().contains("Quota exceeded"));
    }
}
