//! Incremental decoding of a message head out of a receive buffer.
//!
//! A head is complete once the blank line after the field block is in the
//! buffer. Until then the scanner remembers how far it has already looked so
//! that repeated calls on a growing buffer stay linear. Once complete, the
//! head bytes are split off, parsed, and the framing mode for the following
//! body is resolved in the same step.

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::config::ParserConfig;
use crate::protocol::{
    FramingMode, Method, ParseError, RequestHead, ResponseHead, resolve_request_framing,
    resolve_response_framing,
};
use crate::utils::ensure;

use super::field::parse_field_block;
use super::start_line::{parse_request_line, parse_status_line};

#[derive(Debug)]
pub(crate) struct RequestHeadDecoder {
    scanner: HeadScanner,
}

impl RequestHeadDecoder {
    pub(crate) fn new(config: ParserConfig) -> Self {
        Self { scanner: HeadScanner::new(config) }
    }

    pub(crate) fn decode(&mut self, src: &mut BytesMut) -> Result<Option<(RequestHead, FramingMode)>, ParseError> {
        let Some(head) = self.scanner.split_head(src)? else {
            return Ok(None);
        };
        let config = &self.scanner.config;
        let (line, fields) = split_start_line(&head, config)?;
        let request_line = parse_request_line(line, config)?;
        let headers = parse_field_block(fields, config)?;
        let framing = resolve_request_framing(request_line.version(), &headers, config)?;
        trace!(?framing, "request head complete");
        Ok(Some((RequestHead::new(request_line, headers), framing)))
    }
}

#[derive(Debug)]
pub(crate) struct ResponseHeadDecoder {
    scanner: HeadScanner,
    request_method: Method,
}

impl ResponseHeadDecoder {
    pub(crate) fn new(config: ParserConfig) -> Self {
        Self { scanner: HeadScanner::new(config), request_method: Method::Get }
    }

    /// Records which request this response answers. A `HEAD` request forces
    /// the response body to [`FramingMode::NoBody`] no matter what the
    /// headers claim.
    pub(crate) fn set_request_method(&mut self, method: Method) {
        self.request_method = method;
    }

    pub(crate) fn decode(&mut self, src: &mut BytesMut) -> Result<Option<(ResponseHead, FramingMode)>, ParseError> {
        let Some(head) = self.scanner.split_head(src)? else {
            return Ok(None);
        };
        let config = &self.scanner.config;
        let (line, fields) = split_start_line(&head, config)?;
        let status_line = parse_status_line(line, config)?;
        let headers = parse_field_block(fields, config)?;
        let framing = resolve_response_framing(
            &self.request_method,
            status_line.status(),
            status_line.version(),
            &headers,
            config,
        )?;
        trace!(?framing, "response head complete");
        Ok(Some((ResponseHead::new(status_line, headers), framing)))
    }
}

#[derive(Debug)]
struct HeadScanner {
    config: ParserConfig,
    scan_pos: usize,
}

impl HeadScanner {
    fn new(config: ParserConfig) -> Self {
        Self { config, scan_pos: 0 }
    }

    /// Splits a complete head block (start line through the blank line) off
    /// the front of `src`, or returns `None` until one is buffered.
    fn split_head(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
        if self.scan_pos == 0 {
            skip_interstitial_crlf(src, &self.config);
        }
        match find_head_end(src, self.scan_pos, &self.config) {
            Some(end) => {
                ensure!(
                    end <= self.config.max_head_bytes,
                    ParseError::malformed_header(format!(
                        "message head exceeds {} bytes",
                        self.config.max_head_bytes
                    ))
                );
                self.scan_pos = 0;
                Ok(Some(src.split_to(end)))
            }
            None => {
                ensure!(
                    src.len() <= self.config.max_head_bytes,
                    ParseError::malformed_header(format!(
                        "message head exceeds {} bytes",
                        self.config.max_head_bytes
                    ))
                );
                // partial terminators are at most three bytes long
                self.scan_pos = src.len().saturating_sub(3);
                Ok(None)
            }
        }
    }
}

/// Robustness per RFC 7230: ignore blank lines in front of a message head.
fn skip_interstitial_crlf(src: &mut BytesMut, config: &ParserConfig) {
    loop {
        if src.starts_with(b"\r\n") {
            src.advance(2);
        } else if config.allow_lf_without_cr && src.starts_with(b"\n") {
            src.advance(1);
        } else {
            return;
        }
    }
}

/// Index one past the blank line ending the head, if already buffered.
fn find_head_end(src: &[u8], start: usize, config: &ParserConfig) -> Option<usize> {
    if config.allow_lf_without_cr {
        for (offset, &b) in src[start..].iter().enumerate() {
            if b != b'\n' {
                continue;
            }
            let i = start + offset;
            match (src.get(i + 1), src.get(i + 2)) {
                (Some(&b'\n'), _) => return Some(i + 2),
                (Some(&b'\r'), Some(&b'\n')) => return Some(i + 3),
                _ => {}
            }
        }
        None
    } else {
        src[start..].windows(4).position(|w| w == b"\r\n\r\n").map(|i| start + i + 4)
    }
}

fn split_start_line<'a>(head: &'a [u8], config: &ParserConfig) -> Result<(&'a [u8], &'a [u8]), ParseError> {
    let Some(lf) = head.iter().position(|&b| b == b'\n') else {
        return Err(ParseError::malformed_start_line("head block without a line terminator"));
    };
    let mut line = &head[..lf];
    if let Some(stripped) = line.strip_suffix(b"\r") {
        line = stripped;
    } else {
        ensure!(
            config.allow_lf_without_cr,
            ParseError::malformed_start_line("line feed without preceding carriage return")
        );
    }
    Ok((line, &head[lf + 1..]))
}
