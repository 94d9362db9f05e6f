//! Request head: request line plus header table.

use crate::protocol::{HeaderTable, HttpVersion, Method, RequestLine};

/// Everything known about a request before its body: the request line and
/// the headers. Body bytes are read separately, through the body reader the
/// parser hands out together with this head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    line: RequestLine,
    headers: HeaderTable,
}

impl RequestHead {
    pub fn new(line: RequestLine, headers: HeaderTable) -> Self {
        Self { line, headers }
    }

    pub fn method(&self) -> &Method {
        self.line.method()
    }

    pub fn target(&self) -> &str {
        self.line.target()
    }

    pub fn version(&self) -> HttpVersion {
        self.line.version()
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.line
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    /// Whether the client asked for a `100 Continue` interim response
    /// before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.headers
            .get_all("expect")
            .iter()
            .any(|value| value.trim().eq_ignore_ascii_case("100-continue"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let head = RequestHead::new(
            RequestLine::new(Method::Get, "/index.html", HttpVersion::HTTP_11),
            HeaderTable::builder().insert("Host", "example.com").build(),
        );
        assert_eq!(head.method(), &Method::Get);
        assert_eq!(head.target(), "/index.html");
        assert_eq!(head.version(), HttpVersion::HTTP_11);
        assert_eq!(head.headers().get("host"), Some("example.com"));
        assert!(!head.expects_continue());
    }

    #[test]
    fn expect_continue_detection() {
        let head = RequestHead::new(
            RequestLine::new(Method::Post, "/upload", HttpVersion::HTTP_11),
            HeaderTable::builder().insert("Expect", "100-Continue").build(),
        );
        assert!(head.expects_continue());
    }
}
