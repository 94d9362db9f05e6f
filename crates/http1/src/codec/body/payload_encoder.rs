//! Dispatch over the framing mode for body encoding.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{FramingMode, PayloadItem, SendError};
use crate::utils::ensure;

use super::chunked_encoder::ChunkedEncoder;
use super::length_encoder::LengthEncoder;

#[derive(Debug)]
pub(crate) struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug)]
enum Kind {
    NoBody,
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    Close,
}

impl PayloadEncoder {
    pub(crate) fn new(framing: FramingMode) -> Self {
        let kind = match framing {
            FramingMode::NoBody => Kind::NoBody,
            FramingMode::ContentLength(n) => Kind::Length(LengthEncoder::new(n)),
            FramingMode::Chunked => Kind::Chunked(ChunkedEncoder),
            FramingMode::CloseDelimited => Kind::Close,
        };
        Self { kind }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::NoBody => match item {
                PayloadItem::Chunk(data) => {
                    ensure!(
                        !data.has_remaining(),
                        SendError::invalid_body("message framed without a body cannot carry payload bytes")
                    );
                    Ok(())
                }
                PayloadItem::Eof(trailers) => {
                    ensure!(trailers.is_none(), SendError::invalid_body("trailers require chunked framing"));
                    Ok(())
                }
            },
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::Close => match item {
                PayloadItem::Chunk(data) => {
                    dst.put(data);
                    Ok(())
                }
                PayloadItem::Eof(trailers) => {
                    ensure!(trailers.is_none(), SendError::invalid_body("trailers require chunked framing"));
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn bodyless_framing_refuses_payload_bytes() {
        let mut encoder = PayloadEncoder::new(FramingMode::NoBody);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::new()), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof(None), &mut dst).unwrap();
        assert!(dst.is_empty());

        let err = encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"x")), &mut dst).unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }), "{err}");
    }

    #[test]
    fn close_delimited_bodies_pass_through_verbatim() {
        let mut encoder = PayloadEncoder::new(FramingMode::CloseDelimited);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"raw")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof(None), &mut dst).unwrap();
        assert_eq!(&dst[..], b"raw");
    }
}
