//! Stream items exchanged between the codecs and the parser.
//!
//! A decoded message arrives as one [`Message::Header`] item followed by
//! zero or more payload chunks and exactly one [`PayloadItem::Eof`]; an
//! encoded message is fed to the encoder in the same order. The `Eof` item
//! carries the trailer fields of a chunked body when the peer sent any.

use crate::protocol::HeaderTable;
use bytes::{Buf, Bytes};

/// Either the head of a message or a piece of its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T, D: Buf = Bytes> {
    Header(T),
    Payload(PayloadItem<D>),
}

impl<T, D: Buf> Message<T, D> {
    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header(_))
    }

    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Payload(_))
    }

    pub fn into_header(self) -> Option<T> {
        match self {
            Self::Header(head) => Some(head),
            Self::Payload(_) => None,
        }
    }

    pub fn into_payload(self) -> Option<PayloadItem<D>> {
        match self {
            Self::Header(_) => None,
            Self::Payload(item) => Some(item),
        }
    }
}

/// A piece of body data, or the end of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<D: Buf = Bytes> {
    Chunk(D),
    /// Body complete. Carries trailer fields when the body was chunked and
    /// the peer sent a non-empty trailer section.
    Eof(Option<HeaderTable>),
}

impl<D: Buf> PayloadItem<D> {
    pub fn is_chunk(&self) -> bool {
        matches!(self, Self::Chunk(_))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof(_))
    }

    pub fn into_chunk(self) -> Option<D> {
        match self {
            Self::Chunk(data) => Some(data),
            Self::Eof(_) => None,
        }
    }

    pub fn trailers(&self) -> Option<&HeaderTable> {
        match self {
            Self::Chunk(_) => None,
            Self::Eof(trailers) => trailers.as_ref(),
        }
    }

    pub fn into_trailers(self) -> Option<HeaderTable> {
        match self {
            Self::Chunk(_) => None,
            Self::Eof(trailers) => trailers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_accessors() {
        let header: Message<&str> = Message::Header("head");
        assert!(header.is_header());
        assert_eq!(header.into_header(), Some("head"));

        let payload: Message<&str> = Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"data")));
        assert!(payload.is_payload());
        assert_eq!(payload.into_payload().and_then(PayloadItem::into_chunk), Some(Bytes::from_static(b"data")));
    }

    #[test]
    fn payload_item_accessors() {
        let chunk: PayloadItem = PayloadItem::Chunk(Bytes::from_static(b"x"));
        assert!(chunk.is_chunk());
        assert!(!chunk.is_eof());

        let trailers = HeaderTable::builder().insert("Expires", "never").build();
        let eof: PayloadItem = PayloadItem::Eof(Some(trailers));
        assert!(eof.is_eof());
        assert_eq!(eof.trailers().and_then(|t| t.get("expires")), Some("never"));
    }
}
