//! Content-coding decoders behind a pluggable registry.
//!
//! This covers `Content-Encoding`, not `Transfer-Encoding`; the chunked
//! transfer-coding is handled inside the codecs. Decoders are write-through
//! sinks: compressed bytes go in the top of a [`DecodeSink`] chain and the
//! decoded bytes land in a [`BufferSink`] at the bottom. The registry ships
//! with `identity` only; compression codings are registered by the caller
//! (the transport crate contributes gzip and deflate).

use std::collections::HashMap;
use std::io;
use std::io::Write as _;
use std::sync::Arc;

use crate::protocol::ParseError;

/// One link of a decode chain. Bytes written in are transformed and
/// forwarded to the inner sink; [`finish`](Self::finish) flushes whatever
/// the coding still buffers and drains the rest of the chain down to the
/// decoded bytes.
pub trait DecodeSink: io::Write + Send {
    fn finish(self: Box<Self>) -> io::Result<Vec<u8>>;
}

/// A content-coding decoder that can be registered under its coding name.
pub trait ContentDecoder: Send + Sync {
    /// Coding name as it appears in `Content-Encoding`, lowercase.
    fn name(&self) -> &'static str;

    /// Wraps `sink` so that encoded bytes written to the returned sink come
    /// out decoded in `sink`.
    fn wrap(&self, sink: Box<dyn DecodeSink>) -> Box<dyn DecodeSink>;
}

/// The terminal sink of every chain: collects decoded bytes as-is.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Vec<u8>,
}

impl io::Write for BufferSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DecodeSink for BufferSink {
    fn finish(self: Box<Self>) -> io::Result<Vec<u8>> {
        Ok(self.buf)
    }
}

/// The `identity` coding: bytes pass through untouched.
#[derive(Debug, Default)]
pub struct IdentityDecoder;

impl ContentDecoder for IdentityDecoder {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn wrap(&self, sink: Box<dyn DecodeSink>) -> Box<dyn DecodeSink> {
        sink
    }
}

/// Process-wide map from coding name to decoder. Populated at startup,
/// read-only afterwards, safe to share across tasks.
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn ContentDecoder>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DecoderRegistry").field("encodings", &names).finish()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        let mut registry = Self { decoders: HashMap::new() };
        registry.register(Arc::new(IdentityDecoder));
        registry
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `decoder` under its own name, replacing any previous
    /// decoder for that coding.
    pub fn register(&mut self, decoder: Arc<dyn ContentDecoder>) {
        self.decoders.insert(decoder.name().to_ascii_lowercase(), decoder);
    }

    /// Case-insensitive lookup by coding name.
    pub fn lookup(&self, encoding: &str) -> Option<Arc<dyn ContentDecoder>> {
        self.decoders.get(&encoding.to_ascii_lowercase()).map(Arc::clone)
    }

    /// Decodes `bytes` through a single coding.
    pub fn decode(&self, encoding: &str, bytes: &[u8]) -> Result<Vec<u8>, ParseError> {
        self.decode_chain(std::iter::once(encoding), bytes)
    }

    /// Decodes `bytes` through a `Content-Encoding` chain. `encodings` lists
    /// the codings in the order the peer applied them, so the chain is built
    /// outward from the buffer and the wire bytes are written into the
    /// coding applied last.
    pub fn decode_chain<'a, I>(&self, encodings: I, bytes: &[u8]) -> Result<Vec<u8>, ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sink: Box<dyn DecodeSink> = Box::new(BufferSink::default());
        for encoding in encodings {
            let encoding = encoding.trim();
            let decoder =
                self.lookup(encoding).ok_or_else(|| ParseError::unknown_encoding(encoding))?;
            sink = decoder.wrap(sink);
        }
        sink.write_all(bytes).map_err(ParseError::io)?;
        sink.finish().map_err(ParseError::io)
    }
}
