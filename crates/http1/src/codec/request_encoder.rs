//! Streaming encoder for HTTP requests.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::body::PayloadEncoder;
use crate::codec::head::encode_request_head;
use crate::protocol::{FramingMode, Message, RequestHead, SendError};

/// Encoder counterpart of the request decoder: one head item arms a
/// [`PayloadEncoder`] for the chosen framing, payload items flow through it
/// until `Eof` disarms it.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: Buf> Encoder<Message<(RequestHead, FramingMode), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(RequestHead, FramingMode), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, framing)) => {
                if self.payload_encoder.is_some() {
                    error!("request head while the previous body is incomplete");
                    return Err(SendError::invalid_body("request head while the previous body is incomplete"));
                }
                self.payload_encoder = Some(PayloadEncoder::new(framing));
                encode_request_head(&head, framing, dst)
            }
            Message::Payload(item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("payload item before any request head");
                    return Err(SendError::invalid_body("payload item before any request head"));
                };
                let is_eof = item.is_eof();
                let result = payload_encoder.encode(item, dst);
                if is_eof {
                    self.payload_encoder.take();
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HeaderTable, HttpVersion, Method, PayloadItem, RequestLine};
    use bytes::Bytes;

    fn post(target: &str) -> RequestHead {
        RequestHead::new(
            RequestLine::new(Method::Post, target, HttpVersion::HTTP_11),
            HeaderTable::builder().insert("Host", "example.com").build(),
        )
    }

    #[test]
    fn encodes_head_and_sized_body() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();
        encoder
            .encode(Message::<_, Bytes>::Header((post("/upload"), FramingMode::ContentLength(5))), &mut dst)
            .unwrap();
        encoder.encode(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut dst).unwrap();
        encoder.encode(Message::<_, Bytes>::Payload(PayloadItem::Eof(None)), &mut dst).unwrap();
        assert_eq!(
            &dst[..],
            b"POST /upload HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello"
        );
    }

    #[test]
    fn refuses_interleaved_heads() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();
        encoder
            .encode(Message::<_, Bytes>::Header((post("/a"), FramingMode::ContentLength(5))), &mut dst)
            .unwrap();
        let err = encoder
            .encode(Message::<_, Bytes>::Header((post("/b"), FramingMode::NoBody)), &mut dst)
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }), "{err}");
    }

    #[test]
    fn refuses_payload_without_a_head() {
        let mut encoder = RequestEncoder::new();
        let mut dst = BytesMut::new();
        let err = encoder
            .encode(Message::<(RequestHead, FramingMode)>::Payload(PayloadItem::Eof(None)), &mut dst)
            .unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }), "{err}");
    }
}
