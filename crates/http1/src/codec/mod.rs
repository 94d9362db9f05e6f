//! Codecs for streaming HTTP/1.x messages over `tokio-util` framed I/O.
//!
//! Every codec emits or consumes [`Message`](crate::protocol::Message)
//! items: one `Header` carrying the parsed head together with the framing
//! mode resolved for its body, followed by zero or more payload `Chunk`s
//! and exactly one `Eof`. The decoders switch between a head phase and a
//! payload phase internally so that pipelined messages stay separated.
//!
//! # Architecture
//!
//! - Decoding:
//!   - [`RequestDecoder`] / [`ResponseDecoder`]: whole-message decoders
//!   - Head parsing via the `head` submodule
//!   - Payload decoding via the `body` submodule, one decoder per
//!     framing mode
//! - Encoding:
//!   - [`RequestEncoder`] / [`ResponseEncoder`]: whole-message encoders
//!   - Framing headers are reconciled from the chosen framing mode, never
//!     copied from caller-supplied header entries
//!
//! # Example
//!
//! ```no_run
//! use http1_wire::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::default();
//! let mut buffer = BytesMut::new();
//! // ... read socket bytes into the buffer ...
//! let item = decoder.decode(&mut buffer);
//! ```

mod body;
mod head;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;
