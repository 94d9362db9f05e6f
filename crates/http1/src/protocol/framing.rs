//! Body framing resolution, the RFC 7230 section 3.3.3 decision.
//!
//! Everything here is a pure function of the head that was just parsed:
//! no I/O, no caching. The resolver runs fresh for every message because a
//! framing decision leaking from one message to the next is exactly the
//! kind of bug that desynchronizes a keep-alive connection.
//!
//! The decision order is load-bearing. In particular, a message carrying
//! both Transfer-Encoding and Content-Length is rejected instead of picking
//! a winner (request smuggling works by making two agents pick different
//! winners); [`crate::config::ParserConfig::allow_te_with_content_length`]
//! is the explicit opt-in that lets Transfer-Encoding win.

use crate::config::ParserConfig;
use crate::protocol::{HeaderTable, HttpVersion, Method, ParseError, StatusCode};
use crate::utils::ensure;

/// How the body of one message is delimited on the wire.
///
/// Computed once per message, never recomputed mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// No body bytes follow the head.
    NoBody,
    /// Exactly this many body bytes follow.
    ContentLength(u64),
    /// The body uses the chunked transfer-coding.
    Chunked,
    /// The body runs until the peer closes the connection (responses only).
    CloseDelimited,
}

impl FramingMode {
    pub fn is_no_body(self) -> bool {
        matches!(self, Self::NoBody)
    }

    /// Whether any payload bytes are expected on the wire.
    pub fn payload_expected(self) -> bool {
        match self {
            Self::NoBody => false,
            Self::ContentLength(n) => n > 0,
            Self::Chunked | Self::CloseDelimited => true,
        }
    }
}

/// Framing decision for a request head.
///
/// Requests never resolve to [`FramingMode::CloseDelimited`]: a request
/// without framing headers has no body.
pub fn resolve_request_framing(
    version: HttpVersion,
    headers: &HeaderTable,
    config: &ParserConfig,
) -> Result<FramingMode, ParseError> {
    if let Some(mode) = resolve_transfer_framing(version, headers, config)? {
        return Ok(mode);
    }
    match parse_content_length(headers)? {
        Some(n) => Ok(FramingMode::ContentLength(n)),
        None => Ok(FramingMode::NoBody),
    }
}

/// Framing decision for a response head.
///
/// Needs the method of the request this response answers: responses to HEAD
/// never have a body, whatever their headers claim.
pub fn resolve_response_framing(
    request_method: &Method,
    status: StatusCode,
    version: HttpVersion,
    headers: &HeaderTable,
    config: &ParserConfig,
) -> Result<FramingMode, ParseError> {
    if *request_method == Method::Head || !status_has_body(status) {
        return Ok(FramingMode::NoBody);
    }
    if let Some(mode) = resolve_transfer_framing(version, headers, config)? {
        return Ok(mode);
    }
    if let Some(n) = parse_content_length(headers)? {
        return Ok(FramingMode::ContentLength(n));
    }
    if is_persistent(version, headers) { Ok(FramingMode::NoBody) } else { Ok(FramingMode::CloseDelimited) }
}

/// Transfer-Encoding handling shared by both resolvers. `Ok(None)` means no
/// Transfer-Encoding header is present and Content-Length (or nothing)
/// governs framing.
fn resolve_transfer_framing(
    version: HttpVersion,
    headers: &HeaderTable,
    config: &ParserConfig,
) -> Result<Option<FramingMode>, ParseError> {
    let te_values = headers.get_all("transfer-encoding");
    if te_values.is_empty() {
        return Ok(None);
    }
    ensure!(
        !headers.contains("content-length") || config.allow_te_with_content_length,
        ParseError::invalid_message_frame("message carries both content-length and transfer-encoding")
    );
    ensure!(
        version >= HttpVersion::HTTP_11,
        ParseError::invalid_message_frame("transfer-encoding requires HTTP/1.1")
    );
    let last_coding = te_values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .next_back();
    match last_coding {
        Some(token) if token.eq_ignore_ascii_case("chunked") => Ok(Some(FramingMode::Chunked)),
        _ => Err(ParseError::invalid_message_frame("transfer-encoding does not end with chunked")),
    }
}

/// Content-Length across all entries and comma-joined lists. Identical
/// duplicates collapse to one value; anything conflicting, non-numeric,
/// negative or overflowing is an invalid frame.
pub fn parse_content_length(headers: &HeaderTable) -> Result<Option<u64>, ParseError> {
    let values = headers.get_all("content-length");
    if values.is_empty() {
        return Ok(None);
    }
    let mut agreed: Option<u64> = None;
    for value in values {
        for token in value.split(',') {
            let n = parse_decimal(token.trim())?;
            match agreed {
                None => agreed = Some(n),
                Some(prev) => {
                    ensure!(prev == n, ParseError::invalid_message_frame("conflicting content-length values"));
                }
            }
        }
    }
    Ok(agreed)
}

fn parse_decimal(token: &str) -> Result<u64, ParseError> {
    ensure!(
        !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()),
        ParseError::invalid_message_frame("content-length is not a non-negative integer")
    );
    token
        .parse::<u64>()
        .map_err(|e| ParseError::invalid_message_frame(format!("content-length out of range: {e}")))
}

/// Whether this status code allows a body at all (1xx, 204 and 304 do not).
pub fn status_has_body(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

/// Connection persistence after this message: a `close` token wins, then an
/// explicit `keep-alive` token, then the version default (1.1 and newer are
/// persistent).
pub fn is_persistent(version: HttpVersion, headers: &HeaderTable) -> bool {
    let mut keep_alive_token = false;
    for value in headers.get_all("connection") {
        for token in value.split(',') {
            let token = token.trim();
            if token.eq_ignore_ascii_case("close") {
                return false;
            }
            if token.eq_ignore_ascii_case("keep-alive") {
                keep_alive_token = true;
            }
        }
    }
    keep_alive_token || version >= HttpVersion::HTTP_11
}
