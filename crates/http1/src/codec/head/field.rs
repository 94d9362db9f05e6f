//! Field block parsing: raw header lines into a [`HeaderTable`].
//!
//! The block is consumed line by line until an empty line. Obsolete line
//! folding (a continuation line starting with space or tab) appends to the
//! previous field's value with a single space, unless disabled. Headers in
//! [`ParserConfig::framing_singleton_headers`] reject duplicates whose
//! values conflict, which closes off request smuggling through repeated
//! `Content-Length` or `Transfer-Encoding` lines.

use crate::config::ParserConfig;
use crate::protocol::{HeaderTable, ParseError};
use crate::utils::ensure;

use super::start_line::is_token_byte;

pub(crate) fn parse_field_block(block: &[u8], config: &ParserConfig) -> Result<HeaderTable, ParseError> {
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut rest = block;
    while let Some(line) = next_line(&mut rest, config)? {
        if line.is_empty() {
            break;
        }
        if line[0] == b' ' || line[0] == b'\t' {
            ensure!(config.allow_obs_fold, ParseError::malformed_header("obsolete line folding is not allowed"));
            let Some((_, value)) = fields.last_mut() else {
                return Err(ParseError::malformed_header("continuation line without a preceding field"));
            };
            value.push(' ');
            value.push_str(trim_ows(field_value(line, "folded line")?));
            continue;
        }
        ensure!(
            fields.len() < config.max_header_count,
            ParseError::malformed_header(format!("more than {} header fields", config.max_header_count))
        );
        let (name, value) = split_field(line)?;
        if config.is_framing_singleton(&name.to_ascii_lowercase()) {
            for (seen_name, seen_value) in &fields {
                ensure!(
                    !seen_name.eq_ignore_ascii_case(name)
                        || trim_ows(seen_value).eq_ignore_ascii_case(trim_ows(value)),
                    ParseError::invalid_message_frame(format!("conflicting duplicate {name} headers"))
                );
            }
        }
        fields.push((name.to_owned(), value.to_owned()));
    }

    let mut builder = HeaderTable::builder();
    for (name, value) in fields {
        let trimmed = trim_ows(&value).to_owned();
        builder = builder.insert(name, trimmed);
    }
    Ok(builder.build())
}

/// Pops the next line off `buf`, stripping the terminator. A block that
/// ends without a terminator (a trailer fragment) yields its tail as-is.
fn next_line<'a>(buf: &mut &'a [u8], config: &ParserConfig) -> Result<Option<&'a [u8]>, ParseError> {
    if buf.is_empty() {
        return Ok(None);
    }
    let Some(lf) = buf.iter().position(|&b| b == b'\n') else {
        let line = *buf;
        *buf = &[];
        return Ok(Some(line));
    };
    let mut line = &buf[..lf];
    if let Some(stripped) = line.strip_suffix(b"\r") {
        line = stripped;
    } else {
        ensure!(config.allow_lf_without_cr, ParseError::malformed_header("line feed without preceding carriage return"));
    }
    *buf = &buf[lf + 1..];
    Ok(Some(line))
}

fn split_field(line: &[u8]) -> Result<(&str, &str), ParseError> {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return Err(ParseError::malformed_header(format!(
            "field line {:?} has no colon",
            String::from_utf8_lossy(line)
        )));
    };
    let name = &line[..colon];
    ensure!(!name.is_empty(), ParseError::malformed_header("empty field name"));
    ensure!(
        name.iter().copied().all(is_token_byte),
        ParseError::malformed_header(format!(
            "field name {:?} contains illegal characters",
            String::from_utf8_lossy(name)
        ))
    );
    // token bytes are always ASCII
    let name = std::str::from_utf8(name)
        .map_err(|e| ParseError::malformed_header(format!("field name is not valid UTF-8: {e}")))?;
    Ok((name, field_value(&line[colon + 1..], name)?))
}

fn field_value<'a>(bytes: &'a [u8], name: &str) -> Result<&'a str, ParseError> {
    ensure!(
        bytes.iter().all(|&b| b == b'\t' || (b >= 0x20 && b != 0x7F)),
        ParseError::malformed_header(format!("value of field {name} contains control bytes"))
    );
    std::str::from_utf8(bytes)
        .map_err(|e| ParseError::malformed_header(format!("value of field {name} is not valid UTF-8: {e}")))
}

fn trim_ows(value: &str) -> &str {
    value.trim_matches([' ', '\t'])
}
