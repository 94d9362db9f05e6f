//! Streaming decoder for HTTP requests.
//!
//! Decoding alternates between two phases. With no payload decoder armed,
//! the buffer is scanned for a complete head; once one parses, the framing
//! mode resolved from it arms a [`PayloadDecoder`] and every following call
//! yields payload items until `Eof` disarms it again. This keeps pipelined
//! requests cleanly separated: bytes after one message's body are never
//! touched until the next head is asked for.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::head::RequestHeadDecoder;
use crate::config::ParserConfig;
use crate::protocol::{FramingMode, Message, ParseError, PayloadItem, RequestHead};

#[derive(Debug)]
pub struct RequestDecoder {
    head_decoder: RequestHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
    config: ParserConfig,
}

impl RequestDecoder {
    pub fn new(config: ParserConfig) -> Self {
        Self { head_decoder: RequestHeadDecoder::new(config), payload_decoder: None, config }
    }

    /// True while payload items of the current message are still pending.
    pub fn is_mid_payload(&self) -> bool {
        self.payload_decoder.is_some()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, FramingMode)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof(_)) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };
            return Ok(message);
        }

        let message = match self.head_decoder.decode(src)? {
            Some((head, framing)) => {
                self.payload_decoder = Some(PayloadDecoder::new(framing, self.config));
                Some(Message::Header((head, framing)))
            }
            None => None,
        };
        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode_eof(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof(_)) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };
            return Ok(message);
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::unexpected_eof("stream closed inside a message head")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Method;

    fn expect_head(decoder: &mut RequestDecoder, src: &mut BytesMut) -> (RequestHead, FramingMode) {
        match decoder.decode(src).unwrap().unwrap() {
            Message::Header(head) => head,
            Message::Payload(_) => panic!("expected a head"),
        }
    }

    fn expect_eof(decoder: &mut RequestDecoder, src: &mut BytesMut) {
        match decoder.decode(src).unwrap().unwrap() {
            Message::Payload(item) => assert!(item.is_eof()),
            Message::Header(_) => panic!("expected the body terminator"),
        }
    }

    #[test]
    fn separates_pipelined_requests() {
        let mut decoder = RequestDecoder::default();
        let mut src = BytesMut::from(
            &b"GET /first HTTP/1.1\r\nHost: x\r\n\r\nGET /second HTTP/1.1\r\nHost: x\r\n\r\n"[..],
        );

        let (head, framing) = expect_head(&mut decoder, &mut src);
        assert_eq!(head.target(), "/first");
        assert_eq!(framing, FramingMode::NoBody);
        expect_eof(&mut decoder, &mut src);

        let (head, _) = expect_head(&mut decoder, &mut src);
        assert_eq!(head.target(), "/second");
        expect_eof(&mut decoder, &mut src);

        assert!(decoder.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn decodes_a_request_with_a_sized_body() {
        let mut decoder = RequestDecoder::default();
        let mut src = BytesMut::from(&b"POST /u HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..]);

        let (head, framing) = expect_head(&mut decoder, &mut src);
        assert_eq!(head.method(), &Method::Post);
        assert_eq!(framing, FramingMode::ContentLength(5));
        assert!(decoder.is_mid_payload());

        match decoder.decode(&mut src).unwrap().unwrap() {
            Message::Payload(PayloadItem::Chunk(data)) => assert_eq!(data, &b"hello"[..]),
            other => panic!("unexpected item: {other:?}"),
        }
        expect_eof(&mut decoder, &mut src);
        assert!(!decoder.is_mid_payload());
    }

    #[test]
    fn eof_inside_a_head_is_an_error() {
        let mut decoder = RequestDecoder::default();
        let mut src = BytesMut::from(&b"GET / HTTP/1.1\r\nHost"[..]);
        assert!(decoder.decode(&mut src).unwrap().is_none());
        let err = decoder.decode_eof(&mut src).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEndOfStream { .. }), "{err}");
    }

    #[test]
    fn eof_between_messages_ends_the_stream() {
        let mut decoder = RequestDecoder::default();
        let mut src = BytesMut::new();
        assert!(decoder.decode_eof(&mut src).unwrap().is_none());
    }
}
