//! Encoder for `Content-Length` framed bodies.
//!
//! The declared length was already written with the head, so the payload
//! handed in afterwards must match it exactly. Both overshoot and an early
//! `Eof` are refused instead of silently corrupting the connection.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};
use crate::utils::ensure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(data) => {
                let len = data.remaining() as u64;
                ensure!(
                    len <= self.remaining,
                    SendError::invalid_body(format!(
                        "body exceeds the declared content-length by {} bytes",
                        len - self.remaining
                    ))
                );
                self.remaining -= len;
                dst.put(data);
                Ok(())
            }
            PayloadItem::Eof(trailers) => {
                ensure!(trailers.is_none(), SendError::invalid_body("trailers require chunked framing"));
                ensure!(
                    self.remaining == 0,
                    SendError::invalid_body(format!(
                        "body ended {} bytes short of the declared content-length",
                        self.remaining
                    ))
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn passes_exactly_the_declared_bytes_through() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hel")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"lo")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof(None), &mut dst).unwrap();
        assert_eq!(&dst[..], b"hello");
    }

    #[test]
    fn rejects_overshoot_and_shortfall() {
        let mut encoder = LengthEncoder::new(2);
        let mut dst = BytesMut::new();
        let err = encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"abc")), &mut dst).unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }), "{err}");

        let mut encoder = LengthEncoder::new(2);
        let err = encoder.encode(PayloadItem::<Bytes>::Eof(None), &mut dst).unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }), "{err}");
    }
}
