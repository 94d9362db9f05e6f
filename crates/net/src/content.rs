//! Gzip and deflate content decoders, plugged into the registry.
//!
//! Both are synchronous write-through decoders from `flate2`: bytes written
//! into the sink come out decompressed in the inner sink, no bridging thread
//! involved. HTTP's `deflate` coding is the zlib format, so it maps to
//! [`flate2::write::ZlibDecoder`].

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use flate2::write::{GzDecoder, ZlibDecoder};
use http1_wire::encoding::{ContentDecoder, DecodeSink, DecoderRegistry};
use http1_wire::protocol::{HeaderTable, ParseError};

/// The `gzip` coding (RFC 1952).
#[derive(Debug, Default)]
pub struct GzipDecoder;

impl ContentDecoder for GzipDecoder {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn wrap(&self, sink: Box<dyn DecodeSink>) -> Box<dyn DecodeSink> {
        Box::new(FlateSink::Gzip(GzDecoder::new(sink)))
    }
}

/// The `deflate` coding (zlib-wrapped per RFC 7230).
#[derive(Debug, Default)]
pub struct DeflateDecoder;

impl ContentDecoder for DeflateDecoder {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn wrap(&self, sink: Box<dyn DecodeSink>) -> Box<dyn DecodeSink> {
        Box::new(FlateSink::Deflate(ZlibDecoder::new(sink)))
    }
}

enum FlateSink {
    Gzip(GzDecoder<Box<dyn DecodeSink>>),
    Deflate(ZlibDecoder<Box<dyn DecodeSink>>),
}

impl io::Write for FlateSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(decoder) => decoder.write(buf),
            Self::Deflate(decoder) => decoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(decoder) => decoder.flush(),
            Self::Deflate(decoder) => decoder.flush(),
        }
    }
}

impl DecodeSink for FlateSink {
    fn finish(self: Box<Self>) -> io::Result<Vec<u8>> {
        // flate2 validates that the compressed stream ended cleanly before
        // handing the inner sink back
        match *self {
            Self::Gzip(decoder) => decoder.finish()?.finish(),
            Self::Deflate(decoder) => decoder.finish()?.finish(),
        }
    }
}

/// A registry with `identity`, `gzip` and `deflate` registered.
pub fn default_registry() -> DecoderRegistry {
    let mut registry = DecoderRegistry::new();
    registry.register(Arc::new(GzipDecoder));
    registry.register(Arc::new(DeflateDecoder));
    registry
}

/// Applies the `Content-Encoding` chain of `headers` to `body`.
///
/// Bodies without a coding (or coded only with `identity`) pass through
/// untouched. An unregistered coding fails with
/// [`ParseError::UnknownEncoding`]; corrupt compressed data surfaces as
/// [`ParseError::Io`].
pub fn decode_content(
    registry: &DecoderRegistry,
    headers: &HeaderTable,
    body: Bytes,
) -> Result<Bytes, ParseError> {
    let codings: Vec<&str> = headers
        .get_all("content-encoding")
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|coding| !coding.is_empty())
        .collect();
    if codings.iter().all(|coding| coding.eq_ignore_ascii_case("identity")) {
        return Ok(body);
    }
    registry.decode_chain(codings, &body).map(Bytes::from)
}
