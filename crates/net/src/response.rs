//! The materialized response exchanged between handler and transport.

use bytes::Bytes;
use http1_wire::protocol::{
    HeaderTable, HeaderTableBuilder, HttpVersion, ResponseHead, StatusCode, StatusLine,
};
use std::borrow::Cow;

/// A response with its body fully in memory.
///
/// Handlers build one of these for the server to serialize; the client
/// returns one after draining (and content-decoding) the body it read.
#[derive(Debug)]
pub struct Response {
    head: ResponseHead,
    body: Bytes,
    trailers: Option<HeaderTable>,
}

impl Response {
    pub fn builder(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder { status, headers: HeaderTable::builder(), body: Bytes::new() }
    }

    /// A response with the canonical reason phrase, no headers and no body.
    pub fn empty(status: StatusCode) -> Self {
        Self::builder(status).build()
    }

    pub(crate) fn from_parts(head: ResponseHead, body: Bytes, trailers: Option<HeaderTable>) -> Self {
        Self { head, body, trailers }
    }

    pub(crate) fn into_parts(self) -> (ResponseHead, Bytes) {
        (self.head, self.body)
    }

    pub fn status(&self) -> StatusCode {
        self.head.status()
    }

    pub fn version(&self) -> HttpVersion {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderTable {
        self.head.headers()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Trailer fields of a chunked body, if the peer sent any.
    pub fn trailers(&self) -> Option<&HeaderTable> {
        self.trailers.as_ref()
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderTableBuilder,
    body: Bytes,
}

impl ResponseBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        let line = StatusLine::with_canonical_reason(self.status);
        Response {
            head: ResponseHead::new(line, self.headers.build()),
            body: self.body,
            trailers: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_the_canonical_reason() {
        let response = Response::builder(StatusCode::NOT_FOUND)
            .header("Content-Type", "text/plain")
            .body("missing")
            .build();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.version(), HttpVersion::HTTP_11);
        assert_eq!(response.headers().get("content-type"), Some("text/plain"));
        assert_eq!(response.text(), "missing");
        assert!(response.trailers().is_none());
    }

    #[test]
    fn empty_responses_carry_nothing() {
        let response = Response::empty(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
        assert!(response.headers().is_empty());
    }
}
