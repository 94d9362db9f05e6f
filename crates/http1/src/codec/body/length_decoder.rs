//! Decoder for `Content-Length` framed bodies.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof(None)));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let take = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
        self.remaining -= take as u64;
        Ok(Some(PayloadItem::Chunk(src.split_to(take).freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining > 0 && src.is_empty() {
            return Err(ParseError::unexpected_eof(format!(
                "stream closed with {} content-length bytes still missing",
                self.remaining
            )));
        }
        self.decode(src)
    }
}
