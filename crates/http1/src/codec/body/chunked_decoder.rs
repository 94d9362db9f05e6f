//! Decoder for the chunked transfer-coding.
//!
//! The grammar lines (chunk-size, chunk extensions, trailer section) are
//! walked byte by byte so the decoder can suspend at any point and resume
//! when more bytes arrive; chunk data itself is passed through in bulk.
//! Grammar violations are unrecoverable: once the size line is misread the
//! position of every following byte is in doubt, so the error aborts the
//! whole message and the connection must be closed.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::head::parse_field_block;
use crate::config::ParserConfig;
use crate::protocol::{HeaderTable, ParseError, PayloadItem};
use crate::utils::ensure;

/// Chunk size lines are capped at four hex digits, 65535-byte chunks.
/// Leading zeros count against the cap.
const MAX_SIZE_DIGITS: u8 = 4;

#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    config: ParserConfig,
    state: ChunkedState,
    /// Accumulates the size while reading a size line, then counts down
    /// while the chunk data streams through.
    remaining: u64,
    size_digits: u8,
    trailer_buf: BytesMut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Reading hex digits of a chunk-size line.
    Size,
    /// Whitespace after the size, before `;`, or the CR.
    SizeWs,
    /// Inside a chunk extension, discarded up to the CR.
    Extension,
    /// Expecting the LF that ends the size line.
    SizeLf,
    /// Streaming chunk data through.
    Data,
    /// Expecting the CR after the chunk data.
    DataCr,
    /// Expecting the LF after the chunk data.
    DataLf,
    /// At the start of a line in the trailer section.
    TrailerStart,
    /// Inside a trailer line, captured verbatim for later parsing.
    TrailerLine,
    /// Expecting the LF of the final blank line.
    FinalLf,
    /// Terminator seen; the next decode call emits `Eof`.
    End,
}

impl ChunkedDecoder {
    pub(crate) fn new(config: ParserConfig) -> Self {
        Self {
            config,
            state: ChunkedState::Size,
            remaining: 0,
            size_digits: 0,
            trailer_buf: BytesMut::new(),
        }
    }

    fn step(&mut self, byte: u8) -> Result<(), ParseError> {
        self.state = match self.state {
            ChunkedState::Size => {
                if let Some(digit) = hex_value(byte) {
                    ensure!(
                        self.size_digits < MAX_SIZE_DIGITS,
                        ParseError::malformed_chunk("chunk size exceeds four hex digits")
                    );
                    self.size_digits += 1;
                    self.remaining = self.remaining * 16 + digit;
                    ChunkedState::Size
                } else {
                    ensure!(
                        self.size_digits > 0,
                        ParseError::malformed_chunk(format!(
                            "chunk size line starts with {:?}",
                            char::from(byte)
                        ))
                    );
                    size_line_delimiter(byte)?
                }
            }
            ChunkedState::SizeWs => size_line_delimiter(byte)?,
            ChunkedState::Extension => match byte {
                b'\r' => ChunkedState::SizeLf,
                b'\n' => {
                    return Err(ParseError::malformed_chunk("bare line feed inside chunk extensions"));
                }
                _ => ChunkedState::Extension,
            },
            ChunkedState::SizeLf => {
                ensure!(
                    byte == b'\n',
                    ParseError::malformed_chunk("chunk size line must end in CRLF")
                );
                self.size_digits = 0;
                if self.remaining == 0 { ChunkedState::TrailerStart } else { ChunkedState::Data }
            }
            ChunkedState::DataCr => {
                ensure!(
                    byte == b'\r',
                    ParseError::malformed_chunk(format!(
                        "expected CRLF after chunk data, found {:?}",
                        char::from(byte)
                    ))
                );
                ChunkedState::DataLf
            }
            ChunkedState::DataLf => {
                ensure!(byte == b'\n', ParseError::malformed_chunk("chunk data must end in CRLF"));
                ChunkedState::Size
            }
            ChunkedState::TrailerStart => match byte {
                b'\r' => ChunkedState::FinalLf,
                b'\n' if self.config.allow_lf_without_cr => ChunkedState::End,
                b'\n' => {
                    return Err(ParseError::malformed_chunk("bare line feed ends the trailer section"));
                }
                _ => {
                    self.push_trailer_byte(byte)?;
                    ChunkedState::TrailerLine
                }
            },
            ChunkedState::TrailerLine => {
                self.push_trailer_byte(byte)?;
                if byte == b'\n' { ChunkedState::TrailerStart } else { ChunkedState::TrailerLine }
            }
            ChunkedState::FinalLf => {
                ensure!(byte == b'\n', ParseError::malformed_chunk("trailer section must end in CRLF"));
                ChunkedState::End
            }
            ChunkedState::Data | ChunkedState::End => unreachable!("handled in decode"),
        };
        Ok(())
    }

    fn push_trailer_byte(&mut self, byte: u8) -> Result<(), ParseError> {
        ensure!(
            self.trailer_buf.len() < self.config.max_head_bytes,
            ParseError::malformed_chunk(format!(
                "trailer section exceeds {} bytes",
                self.config.max_head_bytes
            ))
        );
        self.trailer_buf.put_u8(byte);
        Ok(())
    }

    fn take_trailers(&mut self) -> Result<Option<HeaderTable>, ParseError> {
        if self.trailer_buf.is_empty() {
            return Ok(None);
        }
        let block = std::mem::take(&mut self.trailer_buf);
        let table = parse_field_block(&block, &self.config)
            .map_err(|e| ParseError::malformed_chunk(format!("invalid trailer section: {e}")))?;
        Ok(Some(table))
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Data => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let take = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
                    self.remaining -= take as u64;
                    if self.remaining == 0 {
                        self.state = ChunkedState::DataCr;
                    }
                    trace!(len = take, "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(src.split_to(take).freeze())));
                }
                ChunkedState::End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof(self.take_trailers()?)));
                }
                _ => {
                    let Some(&byte) = src.first() else {
                        return Ok(None);
                    };
                    src.advance(1);
                    self.step(byte)?;
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::unexpected_eof("stream closed inside a chunked body")),
        }
    }
}

fn size_line_delimiter(byte: u8) -> Result<ChunkedState, ParseError> {
    match byte {
        b' ' | b'\t' => Ok(ChunkedState::SizeWs),
        b';' => Ok(ChunkedState::Extension),
        b'\r' => Ok(ChunkedState::SizeLf),
        _ => Err(ParseError::malformed_chunk(format!(
            "invalid byte {:?} in chunk size line",
            char::from(byte)
        ))),
    }
}

fn hex_value(byte: u8) -> Option<u64> {
    match byte {
        b'0'..=b'9' => Some(u64::from(byte - b'0')),
        b'a'..=b'f' => Some(u64::from(byte - b'a' + 10)),
        b'A'..=b'F' => Some(u64::from(byte - b'A' + 10)),
        _ => None,
    }
}
