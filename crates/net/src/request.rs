//! The materialized request exchanged between transport and handler.

use bytes::Bytes;
use http1_wire::protocol::{
    HeaderTable, HeaderTableBuilder, HttpVersion, Method, RequestHead, RequestLine,
};
use std::borrow::Cow;

/// A request with its body fully in memory.
///
/// The server hands one of these to the [`Handler`](crate::handler::Handler)
/// after draining (and content-decoding) the body; the client takes one and
/// serializes it onto its connection.
#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    body: Bytes,
}

impl Request {
    pub fn builder(method: Method, target: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method,
            target: target.into(),
            version: HttpVersion::HTTP_11,
            headers: HeaderTable::builder(),
            body: Bytes::new(),
        }
    }

    pub fn get(target: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::Post, target)
    }

    pub fn head(target: impl Into<String>) -> RequestBuilder {
        Self::builder(Method::Head, target)
    }

    pub(crate) fn from_parts(head: RequestHead, body: Bytes) -> Self {
        Self { head, body }
    }

    pub(crate) fn into_parts(self) -> (RequestHead, Bytes) {
        (self.head, self.body)
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn target(&self) -> &str {
        self.head.target()
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
}

#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    target: String,
    version: HttpVersion,
    headers: HeaderTableBuilder,
    body: Bytes,
}

impl RequestBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.insert(name, value);
        self
    }

    pub fn version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        let line = RequestLine::new(self.method, self.target, self.version);
        Request { head: RequestHead::new(line, self.headers.build()), body: self.body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_the_head() {
        let request = Request::post("/upload")
            .header("Host", "example.com")
            .header("Content-Type", "text/plain")
            .body("hello")
            .build();

        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.target(), "/upload");
        assert_eq!(request.version(), HttpVersion::HTTP_11);
        assert_eq!(request.headers().get("host"), Some("example.com"));
        assert_eq!(request.text(), "hello");
    }

    #[test]
    fn defaults_are_http_11_and_empty_body() {
        let request = Request::get("/").build();
        assert_eq!(request.version(), HttpVersion::HTTP_11);
        assert!(request.body().is_empty());
        assert!(request.headers().is_empty());
    }
}
