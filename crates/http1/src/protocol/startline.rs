//! Start-line types: request line, status line and their components.

use std::fmt;

/// Request method. Registered methods get their own variant; any other
/// valid token is carried through as [`Method::Extension`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Extension(String),
}

impl Method {
    pub fn from_token(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "CONNECT" => Self::Connect,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "PATCH" => Self::Patch,
            other => Self::Extension(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::Extension(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version as `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HttpVersion {
    major: u8,
    minor: u8,
}

impl HttpVersion {
    pub const HTTP_09: Self = Self { major: 0, minor: 9 };
    pub const HTTP_10: Self = Self { major: 1, minor: 0 };
    pub const HTTP_11: Self = Self { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    pub const fn major(self) -> u8 {
        self.major
    }

    pub const fn minor(self) -> u8 {
        self.minor
    }

    /// Whether this is one of the versions this crate implements.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::HTTP_09 | Self::HTTP_10 | Self::HTTP_11)
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Response status code, 100..=599.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const CONTINUE: Self = Self(100);
    pub const OK: Self = Self(200);
    pub const NO_CONTENT: Self = Self(204);
    pub const NOT_MODIFIED: Self = Self(304);
    pub const BAD_REQUEST: Self = Self(400);
    pub const NOT_FOUND: Self = Self(404);
    pub const REQUEST_TIMEOUT: Self = Self(408);
    pub const PAYLOAD_TOO_LARGE: Self = Self(413);
    pub const HEADER_FIELDS_TOO_LARGE: Self = Self(431);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);
    pub const NOT_IMPLEMENTED: Self = Self(501);

    /// Returns `None` outside 100..=599.
    pub fn new(code: u16) -> Option<Self> {
        (100..=599).contains(&code).then_some(Self(code))
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn is_informational(self) -> bool {
        self.0 / 100 == 1
    }

    pub const fn is_success(self) -> bool {
        self.0 / 100 == 2
    }

    /// Canonical reason phrase for well-known codes.
    pub fn canonical_reason(self) -> Option<&'static str> {
        let reason = match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            206 => "Partial Content",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            411 => "Length Required",
            413 => "Payload Too Large",
            414 => "URI Too Long",
            431 => "Request Header Fields Too Large",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            _ => return None,
        };
        Some(reason)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The first line of a request: `method SP target SP version`.
///
/// The target may be origin-form (`/path`), absolute-form, authority-form
/// (CONNECT) or asterisk-form; this crate carries it through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    version: HttpVersion,
}

impl RequestLine {
    pub fn new(method: Method, target: impl Into<String>, version: HttpVersion) -> Self {
        Self { method, target: target.into(), version }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }
}

/// The first line of a response: `version SP status SP reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    version: HttpVersion,
    status: StatusCode,
    reason: String,
}

impl StatusLine {
    pub fn new(version: HttpVersion, status: StatusCode, reason: impl Into<String>) -> Self {
        Self { version, status, reason: reason.into() }
    }

    /// A status line with the canonical reason phrase, HTTP/1.1.
    pub fn with_canonical_reason(status: StatusCode) -> Self {
        Self::new(HttpVersion::HTTP_11, status, status.canonical_reason().unwrap_or_default())
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Either kind of start line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request(RequestLine),
    Status(StatusLine),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_token_round_trip() {
        assert_eq!(Method::from_token("GET"), Method::Get);
        assert_eq!(Method::from_token("PATCH").as_str(), "PATCH");
        assert_eq!(Method::from_token("PURGE"), Method::Extension("PURGE".to_owned()));
        assert_eq!(Method::from_token("PURGE").as_str(), "PURGE");
    }

    #[test]
    fn version_ordering_and_display() {
        assert!(HttpVersion::HTTP_10 < HttpVersion::HTTP_11);
        assert!(HttpVersion::HTTP_09 < HttpVersion::HTTP_10);
        assert_eq!(HttpVersion::HTTP_11.to_string(), "HTTP/1.1");
        assert!(!HttpVersion::new(2, 0).is_supported());
    }

    #[test]
    fn status_code_bounds() {
        assert!(StatusCode::new(99).is_none());
        assert!(StatusCode::new(600).is_none());
        assert_eq!(StatusCode::new(204), Some(StatusCode::NO_CONTENT));
        assert_eq!(StatusCode::OK.canonical_reason(), Some("OK"));
        assert_eq!(StatusCode::new(599).unwrap().canonical_reason(), None);
    }
}
