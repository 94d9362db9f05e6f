//! Encoder for the chunked transfer-coding.
//!
//! Large payloads are split so every emitted chunk fits in a four hex digit
//! size line. Chunk boundaries are an encoding detail: a decode of the
//! produced stream reproduces the payload bytes, not the original chunking.

use std::io::Write;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadItem, SendError};
use crate::utils::Writer;

/// Largest chunk expressible in four hex digits.
const MAX_CHUNK_PAYLOAD: usize = 0xFFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkedEncoder;

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            // an empty chunk is skipped, a zero size line would end the body
            PayloadItem::Chunk(mut data) => {
                while data.has_remaining() {
                    let n = data.remaining().min(MAX_CHUNK_PAYLOAD);
                    write!(Writer(dst), "{n:X}\r\n")?;
                    dst.reserve(n + 2);
                    dst.put((&mut data).take(n));
                    dst.extend_from_slice(b"\r\n");
                }
                Ok(())
            }
            PayloadItem::Eof(trailers) => {
                dst.extend_from_slice(b"0\r\n");
                if let Some(trailers) = trailers {
                    for entry in trailers.entries() {
                        dst.extend_from_slice(entry.name().as_bytes());
                        dst.extend_from_slice(b": ");
                        dst.extend_from_slice(entry.value().as_bytes());
                        dst.extend_from_slice(b"\r\n");
                    }
                }
                dst.extend_from_slice(b"\r\n");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::body::chunked_decoder::ChunkedDecoder;
    use crate::config::ParserConfig;
    use crate::protocol::HeaderTable;
    use bytes::Bytes;
    use tokio_util::codec::Decoder;

    fn encode_body(payload: &[u8], trailers: Option<HeaderTable>) -> BytesMut {
        let mut encoder = ChunkedEncoder;
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::copy_from_slice(payload)), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof(trailers), &mut dst).unwrap();
        dst
    }

    #[test]
    fn encodes_the_wire_form() {
        let dst = encode_body(b"Wiki", None);
        assert_eq!(&dst[..], b"4\r\nWiki\r\n0\r\n\r\n");
    }

    #[test]
    fn emits_trailers_before_the_final_blank_line() {
        let trailers = HeaderTable::builder().insert("Expires", "never").build();
        let dst = encode_body(b"Wiki", Some(trailers));
        assert_eq!(&dst[..], b"4\r\nWiki\r\n0\r\nExpires: never\r\n\r\n");
    }

    #[test]
    fn splits_chunks_at_the_size_line_ceiling() {
        let payload = vec![7u8; MAX_CHUNK_PAYLOAD + 1];
        let dst = encode_body(&payload, None);
        assert!(dst.starts_with(b"FFFF\r\n"));
        let tail = &dst[6 + MAX_CHUNK_PAYLOAD + 2..];
        assert!(tail.starts_with(b"1\r\n"));
    }

    #[test]
    fn round_trips_payloads_of_notable_sizes() {
        for len in [0usize, 1, 4095, 4096, 1_000_000] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut wire = encode_body(&payload, None);

            let mut decoder = ChunkedDecoder::new(ParserConfig::default());
            let mut decoded = Vec::new();
            loop {
                match decoder.decode(&mut wire).unwrap() {
                    Some(PayloadItem::Chunk(data)) => decoded.extend_from_slice(&data),
                    Some(PayloadItem::Eof(_)) => break,
                    None => panic!("decoder ran dry for payload of {len} bytes"),
                }
            }
            assert_eq!(decoded, payload, "payload of {len} bytes");
            assert!(wire.is_empty());
        }
    }
}
