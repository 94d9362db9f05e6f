//! Message parsing and writing at the transport boundary.
//!
//! [`MessageParser`] drives a codec over any `AsyncRead` source and hands
//! out one message at a time: the parsed head plus a
//! [`BodyReader`](crate::protocol::body::BodyReader) positioned at the body
//! boundary. The reader borrows the parser, so the next head cannot be
//! parsed until the current body is finished or dropped; a dropped body is
//! drained before the next head so keep-alive boundaries stay intact. Any
//! framing error poisons the parser for good, because the stream position
//! relative to the next message can no longer be trusted.
//!
//! [`MessageWriter`] is the outbound counterpart over `AsyncWrite`,
//! serializing a head and a buffered body with the framing the caller
//! chose, re-chunking the body when that framing is chunked.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};
use tracing::debug;

use crate::codec::{RequestDecoder, RequestEncoder, ResponseDecoder, ResponseEncoder};
use crate::config::ParserConfig;
use crate::protocol::body::{BodyReader, EagerBody};
use crate::protocol::{
    FramingMode, Message, Method, ParseError, PayloadItem, RequestHead, ResponseHead, SendError,
};
use crate::utils::ensure;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Parses messages off an `AsyncRead` source, one at a time.
#[derive(Debug)]
pub struct MessageParser<S, C> {
    framed: FramedRead<S, C>,
    poisoned: bool,
}

pub type RequestParser<S> = MessageParser<S, RequestDecoder>;
pub type ResponseParser<S> = MessageParser<S, ResponseDecoder>;

impl<S, C, H> MessageParser<S, C>
where
    S: AsyncRead + Unpin,
    C: Decoder<Item = Message<(H, FramingMode)>, Error = ParseError>,
{
    fn with_decoder(source: S, decoder: C) -> Self {
        Self { framed: FramedRead::with_capacity(source, decoder, READ_BUFFER_SIZE), poisoned: false }
    }

    /// Whether an earlier framing error made the source unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }

    async fn next_head(&mut self) -> Result<Option<(H, FramingMode)>, ParseError> {
        ensure!(
            !self.poisoned,
            ParseError::invalid_message_frame("stream position is untrusted after an earlier framing error")
        );
        loop {
            match self.framed.next().await {
                Some(Ok(Message::Header(head))) => return Ok(Some(head)),
                // leftovers of a body the caller dropped early
                Some(Ok(Message::Payload(_))) => {
                    debug!("discarding unread payload of the previous message");
                }
                Some(Err(e)) => {
                    self.poisoned = true;
                    return Err(e);
                }
                None => return Ok(None),
            }
        }
    }
}

impl<S> MessageParser<S, RequestDecoder>
where
    S: AsyncRead + Unpin,
{
    pub fn new(source: S, config: ParserConfig) -> Self {
        Self::with_decoder(source, RequestDecoder::new(config))
    }

    /// Next request on the source, or `None` once the peer closed cleanly
    /// between messages.
    pub async fn parse_request(
        &mut self,
    ) -> Result<Option<IncomingMessage<'_, FramedRead<S, RequestDecoder>, RequestHead>>, ParseError> {
        let Some((head, framing)) = self.next_head().await? else {
            return Ok(None);
        };
        debug!(method = %head.method(), target = %head.target(), ?framing, "request head parsed");
        let charset = head.headers().content_type_charset().map(ToOwned::to_owned);
        let Self { framed, poisoned } = self;
        Ok(Some(IncomingMessage::new(head, BodyReader::new(framed, poisoned, framing, charset))))
    }
}

impl<S> MessageParser<S, ResponseDecoder>
where
    S: AsyncRead + Unpin,
{
    pub fn new(source: S, config: ParserConfig) -> Self {
        Self::with_decoder(source, ResponseDecoder::new(config))
    }

    /// Next response on the source. `request_method` is the method of the
    /// request this response answers; a `HEAD` there suppresses the body no
    /// matter what the response headers claim.
    pub async fn parse_response(
        &mut self,
        request_method: Method,
    ) -> Result<Option<IncomingMessage<'_, FramedRead<S, ResponseDecoder>, ResponseHead>>, ParseError> {
        self.framed.decoder_mut().set_request_method(request_method);
        let Some((head, framing)) = self.next_head().await? else {
            return Ok(None);
        };
        debug!(status = %head.status(), ?framing, "response head parsed");
        let charset = head.headers().content_type_charset().map(ToOwned::to_owned);
        let Self { framed, poisoned } = self;
        Ok(Some(IncomingMessage::new(head, BodyReader::new(framed, poisoned, framing, charset))))
    }
}

/// A parsed head positioned at its body boundary.
///
/// The body can be streamed through [`body`](Self::body) or materialized in
/// one call with [`eagerly`](Self::eagerly); either way the underlying
/// source ends up at the next message boundary once the body is exhausted.
pub struct IncomingMessage<'a, St, T> {
    head: T,
    body: BodyReader<'a, St>,
}

impl<St, T: std::fmt::Debug> std::fmt::Debug for IncomingMessage<'_, St, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingMessage").field("head", &self.head).field("body", &self.body).finish()
    }
}

impl<'a, St, H, T> IncomingMessage<'a, St, T>
where
    St: futures::Stream<Item = Result<Message<H>, ParseError>> + Unpin,
{
    fn new(head: T, body: BodyReader<'a, St>) -> Self {
        Self { head, body }
    }

    pub fn head(&self) -> &T {
        &self.head
    }

    pub fn framing(&self) -> FramingMode {
        self.body.framing()
    }

    pub fn body(&mut self) -> &mut BodyReader<'a, St> {
        &mut self.body
    }

    pub fn into_parts(self) -> (T, BodyReader<'a, St>) {
        (self.head, self.body)
    }

    /// Drains the body and hands back the head with the materialized bytes.
    pub async fn eagerly(self) -> Result<(T, EagerBody), ParseError> {
        let body = self.body.eagerly().await?;
        Ok((self.head, body))
    }
}

/// Writes messages to an `AsyncWrite` sink.
#[derive(Debug)]
pub struct MessageWriter<W, E> {
    framed: FramedWrite<W, E>,
}

pub type RequestWriter<W> = MessageWriter<W, RequestEncoder>;
pub type ResponseWriter<W> = MessageWriter<W, ResponseEncoder>;

impl<W, E> MessageWriter<W, E>
where
    W: AsyncWrite + Unpin,
{
    pub fn into_inner(self) -> W {
        self.framed.into_inner()
    }

    /// The underlying sink, for interim lines that bypass message framing
    /// (such as `100 Continue`).
    pub fn get_mut(&mut self) -> &mut W {
        self.framed.get_mut()
    }

    async fn write_message<T>(&mut self, head: T, framing: FramingMode, body: Bytes) -> Result<(), SendError>
    where
        E: Encoder<Message<(T, FramingMode)>, Error = SendError>,
    {
        self.framed.feed(Message::Header((head, framing))).await?;
        if !body.is_empty() {
            self.framed.feed(Message::Payload(PayloadItem::Chunk(body))).await?;
        }
        self.framed.feed(Message::Payload(PayloadItem::Eof(None))).await?;
        self.framed.flush().await?;
        Ok(())
    }
}

impl<W> MessageWriter<W, RequestEncoder>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self { framed: FramedWrite::new(sink, RequestEncoder::new()) }
    }

    /// Serializes one request with a buffered body. The body is re-chunked
    /// when `framing` is chunked; an empty body with length framing must be
    /// declared as `ContentLength(0)`.
    pub async fn write_request(&mut self, head: RequestHead, framing: FramingMode, body: Bytes) -> Result<(), SendError> {
        self.write_message(head, framing, body).await
    }
}

impl<W> MessageWriter<W, ResponseEncoder>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self { framed: FramedWrite::new(sink, ResponseEncoder::new()) }
    }

    /// Serializes one response with a buffered body.
    pub async fn write_response(&mut self, head: ResponseHead, framing: FramingMode, body: Bytes) -> Result<(), SendError> {
        self.write_message(head, framing, body).await
    }
}
