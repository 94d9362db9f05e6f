//! Start-line parsing: request lines and status lines.
//!
//! Both parsers take one line with the terminator already stripped and are
//! pure functions of that line. Tokens are separated by single spaces; a
//! request line has two or three tokens (two means an HTTP/0.9 style
//! request with no version), a status line has the version, the status code
//! and an optional reason phrase that may itself contain spaces.

use crate::config::ParserConfig;
use crate::protocol::{HttpVersion, Method, ParseError, RequestLine, StatusCode, StatusLine};
use crate::utils::ensure;

pub(crate) fn parse_request_line(line: &[u8], config: &ParserConfig) -> Result<RequestLine, ParseError> {
    let mut tokens = line.splitn(3, |&b| b == b' ');
    let method = tokens.next().unwrap_or_default();
    let Some(target) = tokens.next() else {
        return Err(ParseError::malformed_start_line("request line needs at least a method and a target"));
    };
    ensure!(!method.is_empty(), ParseError::malformed_start_line("empty method"));
    ensure!(!target.is_empty(), ParseError::malformed_start_line("empty request target"));

    if !config.allow_lenient_start_line {
        ensure!(
            method.iter().copied().all(is_token_byte),
            ParseError::malformed_start_line("method contains illegal characters")
        );
        ensure!(
            target.iter().all(|&b| (0x21..=0x7E).contains(&b)),
            ParseError::malformed_start_line("request target contains illegal characters")
        );
    }

    let version = match tokens.next() {
        Some(token) => parse_version(token, config)?,
        // two tokens and no version is the HTTP/0.9 form
        None => HttpVersion::HTTP_09,
    };

    let method = Method::from_token(as_utf8(method, "method")?);
    Ok(RequestLine::new(method, as_utf8(target, "request target")?, version))
}

pub(crate) fn parse_status_line(line: &[u8], config: &ParserConfig) -> Result<StatusLine, ParseError> {
    let mut tokens = line.splitn(3, |&b| b == b' ');
    let version = tokens.next().unwrap_or_default();
    let Some(code) = tokens.next() else {
        return Err(ParseError::malformed_start_line("status line needs at least a version and a status code"));
    };
    let version = parse_version(version, config)?;

    ensure!(
        code.len() == 3 && code.iter().all(u8::is_ascii_digit),
        ParseError::malformed_start_line("status code must be exactly three digits")
    );
    let number = u16::from(code[0] - b'0') * 100 + u16::from(code[1] - b'0') * 10 + u16::from(code[2] - b'0');
    let Some(status) = StatusCode::new(number) else {
        return Err(ParseError::malformed_start_line(format!("status code {number} out of range")));
    };

    let reason = tokens.next().unwrap_or_default();
    ensure!(
        reason.iter().all(|&b| b == b'\t' || b >= 0x20),
        ParseError::malformed_start_line("reason phrase contains control characters")
    );
    Ok(StatusLine::new(version, status, as_utf8(reason, "reason phrase")?))
}

fn parse_version(token: &[u8], config: &ParserConfig) -> Result<HttpVersion, ParseError> {
    match token {
        b"HTTP/1.1" => Ok(HttpVersion::HTTP_11),
        b"HTTP/1.0" => Ok(HttpVersion::HTTP_10),
        b"HTTP/0.9" => Ok(HttpVersion::HTTP_09),
        _ => {
            ensure!(
                token.len() == 8
                    && token.starts_with(b"HTTP/")
                    && token[5].is_ascii_digit()
                    && token[6] == b'.'
                    && token[7].is_ascii_digit(),
                ParseError::malformed_start_line("version must match HTTP/<digit>.<digit>")
            );
            let version = HttpVersion::new(token[5] - b'0', token[7] - b'0');
            ensure!(
                config.allow_unknown_versions,
                ParseError::malformed_start_line(format!("unsupported version {version}"))
            );
            Ok(version)
        }
    }
}

/// Token bytes per RFC 7230: `tchar`.
pub(crate) fn is_token_byte(b: u8) -> bool {
    matches!(b,
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9'
        | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*'
        | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
}

fn as_utf8<'a>(bytes: &'a [u8], what: &str) -> Result<&'a str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::malformed_start_line(format!("{what} is not valid UTF-8: {e}")))
}
