//! Lazy and eager body views.
//!
//! [`BodyReader`] is the streaming view over one message body: it borrows
//! the connection's framed source exclusively, pulls decoded payload items
//! from it and tracks a small state machine. It is finite and
//! non-restartable; getting the bytes again means re-fetching the message.
//! [`EagerBody`] is what `eagerly()` leaves behind: the fully buffered
//! payload plus the trailer fields and the charset hint of the message it
//! came from.
//!
//! Reuse discipline: the connection may only carry another message after
//! the previous body reached [`BodyState::Exhausted`] normally. A reader
//! that fails, or a materialization that gets interrupted, flips the shared
//! poison flag and the parser refuses to touch the stream again.

use crate::protocol::{FramingMode, HeaderTable, Message, ParseError, PayloadItem};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::borrow::Cow;
use std::fmt;

/// Lifecycle of one body read pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    NotStarted,
    Streaming,
    Exhausted,
    Errored,
}

/// Streaming view over one framed body.
pub struct BodyReader<'a, St> {
    source: &'a mut St,
    poisoned: &'a mut bool,
    framing: FramingMode,
    state: BodyState,
    trailers: Option<HeaderTable>,
    charset: Option<String>,
}

impl<St> fmt::Debug for BodyReader<'_, St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyReader")
            .field("framing", &self.framing)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a, St, H> BodyReader<'a, St>
where
    St: Stream<Item = Result<Message<H>, ParseError>> + Unpin,
{
    pub(crate) fn new(
        source: &'a mut St,
        poisoned: &'a mut bool,
        framing: FramingMode,
        charset: Option<String>,
    ) -> Self {
        Self { source, poisoned, framing, state: BodyState::NotStarted, trailers: None, charset }
    }

    pub fn framing(&self) -> FramingMode {
        self.framing
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == BodyState::Exhausted
    }

    /// Trailer fields of a chunked body, available once exhausted.
    pub fn trailers(&self) -> Option<&HeaderTable> {
        self.trailers.as_ref()
    }

    /// Next piece of decoded body data, `None` once the body is complete.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, ParseError> {
        match self.state {
            BodyState::Exhausted => return Ok(None),
            BodyState::Errored => {
                return Err(ParseError::invalid_message_frame("body already failed, stream position is untrusted"));
            }
            BodyState::NotStarted | BodyState::Streaming => self.state = BodyState::Streaming,
        }
        match self.source.next().await {
            Some(Ok(Message::Payload(PayloadItem::Chunk(data)))) => Ok(Some(data)),
            Some(Ok(Message::Payload(PayloadItem::Eof(trailers)))) => {
                self.trailers = trailers;
                self.state = BodyState::Exhausted;
                Ok(None)
            }
            Some(Ok(Message::Header(_))) => {
                Err(self.fail(ParseError::invalid_message_frame("message head arrived inside a body")))
            }
            Some(Err(e)) => Err(self.fail(e)),
            None => Err(self.fail(ParseError::unexpected_eof("stream closed before the body was complete"))),
        }
    }

    /// Drain the remaining body into an [`EagerBody`], decoding the framing
    /// as it goes. Consumes the reader; afterwards the source is positioned
    /// at the next message boundary.
    pub async fn eagerly(mut self) -> Result<EagerBody, ParseError> {
        let mut buffer = BytesMut::new();
        while let Some(data) = self.chunk().await? {
            buffer.extend_from_slice(&data);
        }
        Ok(EagerBody { bytes: buffer.freeze(), charset: self.charset.take(), trailers: self.trailers.take() })
    }

    fn fail(&mut self, error: ParseError) -> ParseError {
        self.state = BodyState::Errored;
        *self.poisoned = true;
        error
    }
}

/// A fully materialized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EagerBody {
    bytes: Bytes,
    charset: Option<String>,
    trailers: Option<HeaderTable>,
}

impl EagerBody {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn into_parts(self) -> (Bytes, Option<HeaderTable>) {
        (self.bytes, self.trailers)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Charset hint taken from the message's Content-Type header.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Trailer fields of a chunked body, if the peer sent any.
    pub fn trailers(&self) -> Option<&HeaderTable> {
        self.trailers.as_ref()
    }

    /// The payload as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestHead;
    use futures::stream;

    type Item = Result<Message<RequestHead>, ParseError>;

    fn payload(items: Vec<PayloadItem>) -> impl Stream<Item = Item> + Unpin {
        stream::iter(items.into_iter().map(|item| Ok(Message::Payload(item))))
    }

    #[tokio::test]
    async fn streams_chunks_then_exhausts() {
        let mut source = payload(vec![
            PayloadItem::Chunk(Bytes::from_static(b"he")),
            PayloadItem::Chunk(Bytes::from_static(b"llo")),
            PayloadItem::Eof(None),
        ]);
        let mut poisoned = false;
        let mut reader = BodyReader::new(&mut source, &mut poisoned, FramingMode::ContentLength(5), None);

        assert_eq!(reader.state(), BodyState::NotStarted);
        assert_eq!(reader.chunk().await.unwrap().unwrap(), Bytes::from_static(b"he"));
        assert_eq!(reader.state(), BodyState::Streaming);
        assert_eq!(reader.chunk().await.unwrap().unwrap(), Bytes::from_static(b"llo"));
        assert_eq!(reader.chunk().await.unwrap(), None);
        assert_eq!(reader.state(), BodyState::Exhausted);
        // reads past the end keep returning nothing
        assert_eq!(reader.chunk().await.unwrap(), None);
        assert!(!poisoned);
    }

    #[tokio::test]
    async fn eagerly_collects_everything() {
        let trailers = HeaderTable::builder().insert("Checksum", "abc").build();
        let mut source = payload(vec![
            PayloadItem::Chunk(Bytes::from_static(b"Wiki")),
            PayloadItem::Chunk(Bytes::from_static(b"pedia")),
            PayloadItem::Eof(Some(trailers)),
        ]);
        let mut poisoned = false;
        let reader =
            BodyReader::new(&mut source, &mut poisoned, FramingMode::Chunked, Some("utf-8".to_owned()));

        let body = reader.eagerly().await.unwrap();
        assert_eq!(body.bytes().as_ref(), b"Wikipedia");
        assert_eq!(body.len(), 9);
        assert_eq!(body.charset(), Some("utf-8"));
        assert_eq!(body.trailers().and_then(|t| t.get("checksum")), Some("abc"));
        assert_eq!(body.text(), "Wikipedia");
    }

    #[tokio::test]
    async fn source_failure_poisons_the_connection() {
        let items: Vec<Item> = vec![
            Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"x")))),
            Err(ParseError::malformed_chunk("bad size line")),
        ];
        let mut source = stream::iter(items);
        let mut poisoned = false;
        let mut reader = BodyReader::new(&mut source, &mut poisoned, FramingMode::Chunked, None);

        assert!(reader.chunk().await.unwrap().is_some());
        let err = reader.chunk().await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedChunkEncoding { .. }));
        assert_eq!(reader.state(), BodyState::Errored);
        // read through the reader's borrow: `poisoned` itself is still mutably borrowed
        assert!(*reader.poisoned);

        // and stays failed
        let err = reader.chunk().await.unwrap_err();
        assert!(matches!(err, ParseError::InvalidMessageFrame { .. }));
    }

    #[tokio::test]
    async fn early_stream_end_is_an_error() {
        let items: Vec<Item> = vec![Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"x"))))];
        let mut source = stream::iter(items);
        let mut poisoned = false;
        let mut reader = BodyReader::new(&mut source, &mut poisoned, FramingMode::ContentLength(5), None);

        assert!(reader.chunk().await.unwrap().is_some());
        let err = reader.chunk().await.unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEndOfStream { .. }));
        assert!(poisoned);
    }
}
