//! Serialization of message heads.
//!
//! User-supplied `Content-Length` and `Transfer-Encoding` entries are never
//! copied to the wire. The framing mode chosen for the body is the single
//! source of truth and the matching header is emitted from it, so the head
//! can never disagree with how the body is actually framed.

use std::io::Write;

use bytes::BytesMut;

use crate::protocol::{FramingMode, HeaderTable, RequestHead, ResponseHead, SendError, status_has_body};
use crate::utils::{Writer, ensure};

pub(crate) fn encode_request_head(
    head: &RequestHead,
    framing: FramingMode,
    dst: &mut BytesMut,
) -> Result<(), SendError> {
    ensure!(
        framing != FramingMode::CloseDelimited,
        SendError::invalid_body("requests cannot use close-delimited framing")
    );
    write!(Writer(dst), "{} {} {}\r\n", head.method(), head.target(), head.version())?;
    encode_fields(head.headers(), dst);
    match framing {
        FramingMode::NoBody | FramingMode::CloseDelimited => {}
        FramingMode::ContentLength(n) => write!(Writer(dst), "Content-Length: {n}\r\n")?,
        FramingMode::Chunked => dst.extend_from_slice(b"Transfer-Encoding: chunked\r\n"),
    }
    dst.extend_from_slice(b"\r\n");
    Ok(())
}

pub(crate) fn encode_response_head(
    head: &ResponseHead,
    framing: FramingMode,
    dst: &mut BytesMut,
) -> Result<(), SendError> {
    write!(Writer(dst), "{} {} {}\r\n", head.version(), head.status(), head.reason())?;
    encode_fields(head.headers(), dst);
    match framing {
        FramingMode::NoBody => {
            // an explicit zero keeps the connection reusable
            if status_has_body(head.status()) {
                dst.extend_from_slice(b"Content-Length: 0\r\n");
            }
        }
        FramingMode::ContentLength(n) => write!(Writer(dst), "Content-Length: {n}\r\n")?,
        FramingMode::Chunked => dst.extend_from_slice(b"Transfer-Encoding: chunked\r\n"),
        FramingMode::CloseDelimited => {
            if !has_close_token(head.headers()) {
                dst.extend_from_slice(b"Connection: close\r\n");
            }
        }
    }
    dst.extend_from_slice(b"\r\n");
    Ok(())
}

fn encode_fields(headers: &HeaderTable, dst: &mut BytesMut) {
    for group in headers.grouped() {
        for entry in group {
            if entry.name().eq_ignore_ascii_case("content-length")
                || entry.name().eq_ignore_ascii_case("transfer-encoding")
            {
                continue;
            }
            dst.extend_from_slice(entry.name().as_bytes());
            dst.extend_from_slice(b": ");
            dst.extend_from_slice(entry.value().as_bytes());
            dst.extend_from_slice(b"\r\n");
        }
    }
}

fn has_close_token(headers: &HeaderTable) -> bool {
    headers
        .get_all("connection")
        .iter()
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{HttpVersion, Method, RequestLine, StatusCode, StatusLine};

    fn request(method: Method, headers: HeaderTable) -> RequestHead {
        RequestHead::new(RequestLine::new(method, "/", HttpVersion::HTTP_11), headers)
    }

    fn response(status: StatusCode, headers: HeaderTable) -> ResponseHead {
        ResponseHead::new(StatusLine::with_canonical_reason(status), headers)
    }

    #[test]
    fn encodes_a_minimal_get_request() {
        let head = request(Method::Get, HeaderTable::builder().insert("Host", "x").build());
        let mut dst = BytesMut::new();
        encode_request_head(&head, FramingMode::NoBody, &mut dst).unwrap();
        assert_eq!(&dst[..], b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn framing_mode_overrides_user_framing_headers() {
        let headers = HeaderTable::builder()
            .insert("Content-Length", "999")
            .insert("Transfer-Encoding", "chunked")
            .build();
        let head = response(StatusCode::OK, headers);
        let mut dst = BytesMut::new();
        encode_response_head(&head, FramingMode::ContentLength(5), &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
    }

    #[test]
    fn bodyless_statuses_carry_no_length_header() {
        let mut dst = BytesMut::new();
        encode_response_head(&response(StatusCode::NO_CONTENT, HeaderTable::empty()), FramingMode::NoBody, &mut dst)
            .unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 204 No Content\r\n\r\n");

        let mut dst = BytesMut::new();
        encode_response_head(&response(StatusCode::OK, HeaderTable::empty()), FramingMode::NoBody, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn close_delimited_responses_advertise_close() {
        let mut dst = BytesMut::new();
        encode_response_head(&response(StatusCode::OK, HeaderTable::empty()), FramingMode::CloseDelimited, &mut dst)
            .unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n");

        let headers = HeaderTable::builder().insert("Connection", "close").build();
        let mut dst = BytesMut::new();
        encode_response_head(&response(StatusCode::OK, headers), FramingMode::CloseDelimited, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n");
    }

    #[test]
    fn requests_cannot_be_close_delimited() {
        let head = request(Method::Get, HeaderTable::empty());
        let mut dst = BytesMut::new();
        let err = encode_request_head(&head, FramingMode::CloseDelimited, &mut dst).unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }), "{err}");
    }
}
