use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("parse error: {source}")]
    ParseError {
        #[from]
        source: ParseError,
    },

    #[error("send error: {source}")]
    SendError {
        #[from]
        source: SendError,
    },
}

/// Errors raised while reading a message off the wire.
///
/// A parse error is never recoverable in place: the bytes that produced it
/// are already consumed, so the stream position relative to the next message
/// cannot be trusted and the connection must not be reused.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed start line: {reason}")]
    MalformedStartLine { reason: String },

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    #[error("invalid message frame: {reason}")]
    InvalidMessageFrame { reason: String },

    #[error("malformed chunk encoding: {reason}")]
    MalformedChunkEncoding { reason: String },

    #[error("unexpected end of stream: {reason}")]
    UnexpectedEndOfStream { reason: String },

    #[error("unknown content encoding: {name}")]
    UnknownEncoding { name: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn malformed_start_line<S: ToString>(str: S) -> Self {
        Self::MalformedStartLine { reason: str.to_string() }
    }

    pub fn malformed_header<S: ToString>(str: S) -> Self {
        Self::MalformedHeader { reason: str.to_string() }
    }

    pub fn invalid_message_frame<S: ToString>(str: S) -> Self {
        Self::InvalidMessageFrame { reason: str.to_string() }
    }

    pub fn malformed_chunk<S: ToString>(str: S) -> Self {
        Self::MalformedChunkEncoding { reason: str.to_string() }
    }

    pub fn unexpected_eof<S: ToString>(str: S) -> Self {
        Self::UnexpectedEndOfStream { reason: str.to_string() }
    }

    pub fn unknown_encoding<S: ToString>(name: S) -> Self {
        Self::UnknownEncoding { name: name.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while serializing a message onto the wire.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
