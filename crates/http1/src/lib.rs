//! An HTTP/1.x message parsing and framing engine
//!
//! This crate parses raw bytes into structured HTTP/1.x requests and
//! responses, decides how each message body is framed per RFC 7230
//! (length-delimited, chunked, or connection-close-delimited), and exposes
//! bodies both as a stream and as a fully materialized buffer. It is
//! sans-transport: everything works over any `AsyncRead`/`AsyncWrite`, and
//! the companion `http1-net` crate supplies the TCP shell.
//!
//! # Features
//!
//! - From-scratch start-line and header parsing with configurable
//!   strictness
//! - RFC 7230 §3.3.3 body framing resolution, with the conflicting
//!   `Content-Length`/`Transfer-Encoding` combinations rejected outright
//! - Chunked transfer-coding decoder and encoder, including chunk
//!   extensions and trailers
//! - Lazy body streaming or one-call materialization via `eagerly()`
//! - Keep-alive safe: bodies left unread are drained before the next head,
//!   framing errors poison the connection instead of corrupting it
//! - Pluggable `Content-Encoding` decoder registry
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http1_wire::config::ParserConfig;
//! use http1_wire::parser::{RequestParser, ResponseWriter};
//! use http1_wire::protocol::{FramingMode, ResponseHead, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // any AsyncRead works; a TCP stream in production, a slice here
//!     let wire = &b"GET / HTTP/1.1\r\nHost: example\r\n\r\n"[..];
//!     let mut parser = RequestParser::new(wire, ParserConfig::default());
//!
//!     while let Some(message) = parser.parse_request().await? {
//!         let (head, body) = message.eagerly().await?;
//!         println!("{} {} ({} body bytes)", head.method(), head.target(), body.len());
//!     }
//!
//!     let mut writer = ResponseWriter::new(Vec::new());
//!     writer
//!         .write_response(
//!             ResponseHead::from_status(StatusCode::OK),
//!             FramingMode::ContentLength(2),
//!             Bytes::from_static(b"ok"),
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: message model (heads, [`protocol::HeaderTable`], framing
//!   resolution, bodies, errors)
//! - [`codec`]: tokio-util codecs turning bytes into
//!   [`protocol::Message`] items and back
//! - [`parser`]: [`parser::MessageParser`] / [`parser::MessageWriter`], the
//!   per-connection driver over a framed source or sink
//! - [`encoding`]: the `Content-Encoding` decoder registry
//! - [`config`]: [`config::ParserConfig`] limits and leniency flags
//!
//! # Limitations
//!
//! - HTTP/1.x only, no HTTP/2 or HTTP/3
//! - No TLS; wrap the transport or use a proxy
//! - Default limits: 8 KiB head, 64 header fields (configurable)

pub mod codec;
pub mod config;
pub mod encoding;
pub mod parser;
pub mod protocol;

mod utils;
