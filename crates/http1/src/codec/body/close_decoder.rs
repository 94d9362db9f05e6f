//! Decoder for close-delimited bodies: the body is everything until the
//! peer closes the stream, with no length validation.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CloseDecoder;

impl Decoder for CloseDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(Some(PayloadItem::Eof(None)));
        }
        self.decode(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_until_end_of_stream() {
        let mut decoder = CloseDecoder;
        let mut src = BytesMut::from(&b"some"[..]);
        assert_eq!(decoder.decode(&mut src).unwrap().unwrap().into_chunk().unwrap(), &b"some"[..]);
        assert!(decoder.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(b" more");
        assert_eq!(decoder.decode_eof(&mut src).unwrap().unwrap().into_chunk().unwrap(), &b" more"[..]);
        assert!(decoder.decode_eof(&mut src).unwrap().unwrap().is_eof());
    }
}
