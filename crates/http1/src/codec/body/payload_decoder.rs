//! Dispatch over the framing mode for body decoding.
//!
//! A message without a body still goes through here so that every message
//! ends with exactly one [`PayloadItem::Eof`] on the wire-facing stream.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::config::ParserConfig;
use crate::protocol::{FramingMode, ParseError, PayloadItem};

use super::chunked_decoder::ChunkedDecoder;
use super::close_decoder::CloseDecoder;
use super::length_decoder::LengthDecoder;

#[derive(Debug)]
pub(crate) struct PayloadDecoder {
    framing: FramingMode,
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    NoBody,
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    Close(CloseDecoder),
}

impl PayloadDecoder {
    pub(crate) fn new(framing: FramingMode, config: ParserConfig) -> Self {
        let kind = match framing {
            FramingMode::NoBody => Kind::NoBody,
            FramingMode::ContentLength(n) => Kind::Length(LengthDecoder::new(n)),
            FramingMode::Chunked => Kind::Chunked(ChunkedDecoder::new(config)),
            FramingMode::CloseDelimited => Kind::Close(CloseDecoder),
        };
        Self { framing, kind }
    }

    pub(crate) fn framing(&self) -> FramingMode {
        self.framing
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::NoBody => Ok(Some(PayloadItem::Eof(None))),
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
            Kind::Close(decoder) => decoder.decode(src),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::NoBody => Ok(Some(PayloadItem::Eof(None))),
            Kind::Length(decoder) => decoder.decode_eof(src),
            Kind::Chunked(decoder) => decoder.decode_eof(src),
            Kind::Close(decoder) => decoder.decode_eof(src),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodyless_messages_still_emit_one_eof() {
        let mut decoder = PayloadDecoder::new(FramingMode::NoBody, ParserConfig::default());
        let mut src = BytesMut::from(&b"GET /next HTTP/1.1\r\n"[..]);
        assert!(decoder.decode(&mut src).unwrap().unwrap().is_eof());
        // the next pipelined head is untouched
        assert_eq!(src.len(), 20);
    }

    #[test]
    fn carries_the_framing_it_was_built_for() {
        let decoder = PayloadDecoder::new(FramingMode::ContentLength(9), ParserConfig::default());
        assert_eq!(decoder.framing(), FramingMode::ContentLength(9));
    }
}
