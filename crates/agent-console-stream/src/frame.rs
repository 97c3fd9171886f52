use std::collections::VecDeque;

use futures::StreamExt as _;
use futures::stream;

use crate::errors::TransportError;
use crate::transport::ChunkStream;

const DATA_PREFIX: &str = "data:";

/// Splits an arbitrarily chunked byte stream into `data:` frame payloads.
///
/// Bytes that do not yet form a complete line are carried over to the next
/// chunk, so a frame (or a multi-byte character) split across reads is
/// reassembled before it is emitted.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
}

impl FrameParser {
    /// Appends a chunk and returns every payload completed by it, in order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=idx).collect();
            if let Some(payload) = parse_line(&line[..idx]) {
                frames.push(payload);
            }
        }
        frames
    }

    /// Flushes a final unterminated line once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        parse_line(&rest)
    }

    /// Returns the number of buffered bytes not yet part of a complete line.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn parse_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.trim_end_matches('\r');
    let rest = line.strip_prefix(DATA_PREFIX)?;
    let payload = rest.strip_prefix(' ').unwrap_or(rest);
    Some(payload.to_string())
}

/// Turns a chunk stream into a lazy stream of frame payloads.
///
/// The stream ends when the chunk stream ends, or with the first read error.
pub fn frame_stream(
    chunks: ChunkStream,
) -> impl futures::Stream<Item = Result<String, TransportError>> + Send {
    struct State {
        chunks: ChunkStream,
        parser: FrameParser,
        pending: VecDeque<String>,
        done: bool,
    }

    stream::try_unfold(
        State {
            chunks,
            parser: FrameParser::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    return Ok(Some((frame, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.chunks.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.parser.push_chunk(&chunk));
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        state.done = true;
                        state.pending.extend(state.parser.finish());
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn chunks(parts: Vec<Result<&'static str, TransportError>>) -> ChunkStream {
        Box::pin(stream::iter(
            parts
                .into_iter()
                .map(|part| part.map(|s| Bytes::from_static(s.as_bytes()))),
        ))
    }

    #[test]
    fn carries_partial_frame_across_chunks() {
        let mut parser = FrameParser::default();
        assert!(parser.push_chunk(b"data: {\"type\":\"mes").is_empty());
        assert!(parser.pending_len() > 0);
        let frames = parser.push_chunk(b"sage\"}\n\n");
        assert_eq!(frames, vec!["{\"type\":\"message\"}".to_string()]);
        assert_eq!(parser.pending_len(), 0);
    }

    #[test]
    fn emits_every_frame_in_one_chunk_in_order() {
        let mut parser = FrameParser::default();
        let frames = parser.push_chunk(b"data: one\n\ndata: two\r\n\r\ndata:three\n\n");
        assert_eq!(frames, vec!["one", "two", "three"]);
    }

    #[test]
    fn discards_lines_without_data_prefix() {
        let mut parser = FrameParser::default();
        let frames = parser.push_chunk(b": keepalive\nevent: message\nid: 4\ndata: kept\n\n");
        assert_eq!(frames, vec!["kept"]);
    }

    #[test]
    fn reassembles_multibyte_character_split_across_chunks() {
        let mut parser = FrameParser::default();
        let bytes = "data: héllo\n".as_bytes();
        // split inside the two-byte 'é'
        assert!(parser.push_chunk(&bytes[..8]).is_empty());
        assert_eq!(parser.push_chunk(&bytes[8..]), vec!["héllo"]);
    }

    #[test]
    fn finish_flushes_unterminated_data_line() {
        let mut parser = FrameParser::default();
        assert!(parser.push_chunk(b"data: tail").is_empty());
        assert_eq!(parser.finish().as_deref(), Some("tail"));
        assert!(parser.finish().is_none());
    }

    #[tokio::test]
    async fn frame_stream_yields_payloads_then_ends() {
        let frames: Vec<_> = frame_stream(chunks(vec![
            Ok("data: a\n"),
            Ok("\ndata: "),
            Ok("b\n\ndata: c"),
        ]))
        .collect()
        .await;
        let frames: Vec<String> = frames.into_iter().map(|f| f.expect("frame")).collect();
        assert_eq!(frames, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn frame_stream_terminates_on_read_error() {
        let frames: Vec<_> = frame_stream(chunks(vec![
            Ok("data: a\n\n"),
            Err(TransportError::read("connection reset")),
            Ok("data: never\n\n"),
        ]))
        .collect()
        .await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_deref(), Ok("a"));
        assert!(matches!(frames[1], Err(TransportError::Read { .. })));
    }
}
