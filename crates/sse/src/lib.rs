//! Incremental decoding of `text/event-stream` bodies.
//!
//! Both the chat endpoint and the tool endpoint stream their answers as
//! server-sent events; this crate turns a chunked body into a sequence of
//! [`SseEvent`]s without waiting for the body to end.

#![deny(missing_docs)]

mod chunks;

use std::fmt::{self, Display};

pub use chunks::{Chunks, Error as ChunksError};

/// The error type for [`Sse`].
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The underlying body failed.
    ChunksError(ChunksError),
    /// An event is not valid UTF-8.
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChunksError(err) => Display::fmt(err, f),
            Error::InvalidPayload => write!(f, "event is not valid UTF-8"),
        }
    }
}

impl std::error::Error for Error {}

/// A dispatched server-sent event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event` field, if the server named the event.
    pub event: Option<String>,
    /// All `data` lines of the event joined with `\n`.
    pub data: String,
    /// The `id` field, if any.
    pub id: Option<String>,
}

impl SseEvent {
    /// Returns the event name, `message` when the server didn't set one.
    #[inline]
    pub fn name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// A type for reading server-sent events from a chunk stream.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
    exhausted: bool,
}

impl Sse {
    /// Creates a reader over `chunks`.
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
            exhausted: false,
        }
    }

    /// Returns the next event, or `None` when the stream has ended.
    ///
    /// A trailing incomplete event at the end of the stream is dropped.
    pub async fn next_event(&mut self) -> Result<Option<SseEvent>, Error> {
        loop {
            // Events that are already buffered must be handed out before
            // reading further, the peer may be waiting for us.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.chunks.next_chunk().await.map_err(Error::ChunksError)? {
                Some(bytes) => {
                    // Only LF and CRLF line endings are supported, so carriage
                    // returns can be dropped up front. This also covers CRLF
                    // pairs split across chunks.
                    self.buf.extend(bytes.iter().filter(|b| **b != b'\r'));
                }
                None => self.exhausted = true,
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<SseEvent>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        while let Some(eol_idx) =
            self.buf.windows(2).position(|w| w == b"\n\n")
        {
            let block: Vec<u8> = self.buf.drain(0..eol_idx + 2).collect();
            let Ok(block) = str::from_utf8(&block[..eol_idx]) else {
                return Err(Error::InvalidPayload);
            };

            let mut event = SseEvent::default();
            let mut data_lines = Vec::new();
            for line in block.split('\n') {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                match field {
                    "data" => data_lines.push(value),
                    "event" => event.event = Some(value.to_owned()),
                    "id" => event.id = Some(value.to_owned()),
                    // `retry` and unknown fields are ignored.
                    _ => {}
                }
            }

            // Blocks without data are not dispatched.
            if data_lines.is_empty() {
                continue;
            }
            event.data = data_lines.join("\n");
            return Ok(Some(event));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static str]) -> Sse {
        Sse::new(Chunks::from_vec_deque(
            chunks
                .iter()
                .map(|c| Bytes::from_static(c.as_bytes()))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_from(&["data: hello\n\n", "data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap().data, "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap().data, "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let mut sse = sse_from(&["data:", " hello\n", "\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap().data, "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_named_events_and_crlf() {
        let mut sse = sse_from(&[
            ": keep-alive\r\n\r\nevent: endpoint\r\n",
            "data: /messages/?session_id=abc\r",
            "\n\r\nevent: message\r\nid: 7\r\ndata: {\"a\":1}\r\n\r\n",
        ]);

        let event = sse.next_event().await.unwrap().unwrap();
        assert_eq!(event.name(), "endpoint");
        assert_eq!(event.data, "/messages/?session_id=abc");

        let event = sse.next_event().await.unwrap().unwrap();
        assert_eq!(event.name(), "message");
        assert_eq!(event.id.as_deref(), Some("7"));
        assert_eq!(event.data, "{\"a\":1}");

        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_buffered_events_come_first() {
        // Both events arrive in one chunk; the second must not wait for
        // another chunk.
        let mut sse = sse_from(&["data: one\n\ndata: two\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap().data, "one");
        assert_eq!(sse.next_event().await.unwrap().unwrap().data, "two");
    }

    #[tokio::test]
    async fn test_multiline_data() {
        let mut sse = sse_from(&["data: first\ndata: second\n\n"]);
        let event = sse.next_event().await.unwrap().unwrap();
        assert_eq!(event.data, "first\nsecond");
        assert_eq!(event.name(), "message");
    }

    #[tokio::test]
    async fn test_invalid_data() {
        // Unknown fields alone don't make an event.
        let mut sse = sse_from(&["xxxxxx\n\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_from(&["data: hello\n", "data: bye\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = Sse::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(b"data: \xff\xfe\n\n")].into(),
        ));
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }
}
