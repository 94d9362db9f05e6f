//! Streaming decoder for HTTP responses.
//!
//! Works like the request decoder with one extra input: the method of the
//! request this response answers, which must be set before each head so
//! that `HEAD` responses and close-delimited bodies frame correctly.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::head::ResponseHeadDecoder;
use crate::config::ParserConfig;
use crate::protocol::{FramingMode, Message, Method, ParseError, PayloadItem, ResponseHead};

#[derive(Debug)]
pub struct ResponseDecoder {
    head_decoder: ResponseHeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
    config: ParserConfig,
}

impl ResponseDecoder {
    pub fn new(config: ParserConfig) -> Self {
        Self { head_decoder: ResponseHeadDecoder::new(config), payload_decoder: None, config }
    }

    /// Records the method of the request the next response answers.
    /// Defaults to `GET` until set.
    pub fn set_request_method(&mut self, method: Method) {
        self.head_decoder.set_request_method(method);
    }

    /// True while payload items of the current message are still pending.
    pub fn is_mid_payload(&self) -> bool {
        self.payload_decoder.is_some()
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, FramingMode)>;
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
    use crate::protocol::StatusCode;

    #[test]
    fn close_delimited_bodies_finish_at_end_of_stream() {
        let mut decoder = ResponseDecoder::default();
        let mut src = BytesMut::from(&b"HTTP/1.0 200 OK\r\n\r\nall the bytes"[..]);

        let (head, framing) = match decoder.decode(&mut src).unwrap().unwrap() {
            Message::Header(head) => head,
            Message::Payload(_) => panic!("expected a head"),
        };
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(framing, FramingMode::CloseDelimited);

        match decoder.decode(&mut src).unwrap().unwrap() {
            Message::Payload(PayloadItem::Chunk(data)) => assert_eq!(data, &b"all the bytes"[..]),
            other => panic!("unexpected item: {other:?}"),
        }
        // only the closed stream ends the body
        assert!(decoder.decode(&mut src).unwrap().is_none());
        match decoder.decode_eof(&mut src).unwrap().unwrap() {
            Message::Payload(item) => assert!(item.is_eof()),
            Message::Header(_) => panic!("expected the body terminator"),
        }
        assert!(decoder.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn head_responses_ignore_the_advertised_length() {
        let mut decoder = ResponseDecoder::default();
        decoder.set_request_method(Method::Head);
        let mut src = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 99\r\n\r\n"[..]);

        match decoder.decode(&mut src).unwrap().unwrap() {
            Message::Header((_, framing)) => assert_eq!(framing, FramingMode::NoBody),
            Message::Payload(_) => panic!("expected a head"),
        }
        match decoder.decode(&mut src).unwrap().unwrap() {
            Message::Payload(item) => assert!(item.is_eof()),
            Message::Header(_) => panic!("expected the body terminator"),
        }
        assert!(src.is_empty());
    }

    #[test]
    fn chunked_response_streams_and_terminates() {
        let mut decoder = ResponseDecoder::default();
        let mut src = BytesMut::from(
            &b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n"[..],
        );

        match decoder.decode(&mut src).unwrap().unwrap() {
            Message::Header((_, framing)) => assert_eq!(framing, FramingMode::Chunked),
            Message::Payload(_) => panic!("expected a head"),
        }
        let mut body = Vec::new();
        loop {
            match decoder.decode(&mut src).unwrap().unwrap() {
                Message::Payload(PayloadItem::Chunk(data)) => body.extend_from_slice(&data),
                Message::Payload(PayloadItem::Eof(trailers)) => {
                    assert!(trailers.is_none());
                    break;
                }
                Message::Header(_) => panic!("head inside a body"),
            }
        }
        assert_eq!(body, b"Wikipedia");
        assert!(!decoder.is_mid_payload());
    }
}
