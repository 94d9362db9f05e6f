//! Core protocol types: heads, headers, framing, bodies and errors.
//!
//! This module holds everything that describes an HTTP/1.x message
//! independently of how its bytes arrive or leave:
//!
//! - **Start lines**: [`Method`], [`HttpVersion`], [`StatusCode`],
//!   [`RequestLine`], [`StatusLine`]
//! - **Headers**: the ordered, case-insensitive, case-preserving
//!   [`HeaderTable`] and its builder
//! - **Heads**: [`RequestHead`] and [`ResponseHead`], a start line paired
//!   with its headers
//! - **Framing**: [`FramingMode`] and the resolver functions that decide it
//!   from a head
//! - **Stream items**: [`Message`] and [`PayloadItem`], the units the
//!   codecs produce and consume
//! - **Bodies** ([`body`]): the lazy [`body::BodyReader`] and the
//!   materialized [`body::EagerBody`]
//! - **Errors**: [`ParseError`], [`SendError`] and the [`HttpError`]
//!   umbrella

mod message;
pub use message::Message;
pub use message::PayloadItem;

mod headers;
pub use headers::HeaderEntry;
pub use headers::HeaderTable;
pub use headers::HeaderTableBuilder;

mod startline;
pub use startline::HttpVersion;
pub use startline::Method;
pub use startline::RequestLine;
pub use startline::StartLine;
pub use startline::StatusCode;
pub use startline::StatusLine;

mod request;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod framing;
pub use framing::FramingMode;
pub use framing::is_persistent;
pub use framing::parse_content_length;
pub use framing::resolve_request_framing;
pub use framing::resolve_response_framing;
pub use framing::status_has_body;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
