//! Response head: status line plus header table.

use crate::protocol::{HeaderTable, HttpVersion, StatusCode, StatusLine};

/// Everything known about a response before its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    line: StatusLine,
    headers: HeaderTable,
}

impl ResponseHead {
    pub fn new(line: StatusLine, headers: HeaderTable) -> Self {
        Self { line, headers }
    }

    /// An HTTP/1.1 head with the canonical reason phrase and no headers.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(StatusLine::with_canonical_reason(status), HeaderTable::empty())
    }

    pub fn version(&self) -> HttpVersion {
        self.line.version()
    }

    pub fn status(&self) -> StatusCode {
        self.line.status()
    }

    pub fn reason(&self) -> &str {
        self.line.reason()
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.line
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_fills_reason() {
        let head = ResponseHead::from_status(StatusCode::NOT_FOUND);
        assert_eq!(head.status(), StatusCode::NOT_FOUND);
        assert_eq!(head.reason(), "Not Found");
        assert_eq!(head.version(), HttpVersion::HTTP_11);
        assert!(head.headers().is_empty());
    }
}
