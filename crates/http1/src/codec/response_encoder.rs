//! Streaming encoder for HTTP responses.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::body::PayloadEncoder;
use crate::codec::head::encode_response_head;
use crate::protocol::{FramingMode, Message, ResponseHead, SendError};

#[derive(Debug, Default)]
pub struct ResponseEncoder {
    payload_encoder: Option<PayloadEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, FramingMode), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, FramingMode), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, framing)) => {
                if self.payload_encoder.is_some() {
                    error!("response head while the previous body is incomplete");
                    return Err(SendError::invalid_body("response head while the previous body is incomplete"));
                }
                self.payload_encoder = Some(PayloadEncoder::new(framing));
                encode_response_head(&head, framing, dst)
            }
            Message::Payload(item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("payload item before any response head");
                    return Err(SendError::invalid_body("payload item before any response head"));
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
