//! Parser configuration: size limits and strictness knobs.
//!
//! A [`ParserConfig`] is built once, before any parsing starts, and is then
//! copied into the decoders that need it. Defaults are the strict RFC 7230
//! behavior; every `allow_*` flag relaxes one specific rule and nothing else.

/// Header names whose duplicates must agree on a single value because they
/// decide message framing. Conflicting duplicates are rejected outright.
pub const FRAMING_SINGLETON_HEADERS: &[&str] = &["content-length", "transfer-encoding"];

/// Limits and leniency flags shared by all decoders of one connection.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Maximum number of header fields in one head (or trailer) block.
    pub max_header_count: usize,
    /// Maximum byte size of a head block, start line included. Also bounds
    /// the trailer block of a chunked body.
    pub max_head_bytes: usize,
    /// Accept a bare LF where the grammar asks for CRLF in head lines.
    pub allow_lf_without_cr: bool,
    /// Accept non-token bytes in the request method and target.
    pub allow_lenient_start_line: bool,
    /// Accept obsolete line folding (continuation lines starting with
    /// SP/HT), joining the folded line to the previous value with a space.
    pub allow_obs_fold: bool,
    /// Accept a message carrying both Transfer-Encoding and Content-Length,
    /// letting Transfer-Encoding win. Off by default: this combination is
    /// the classic request-smuggling vector.
    pub allow_te_with_content_length: bool,
    /// Accept `HTTP/<digit>.<digit>` versions outside 0.9/1.0/1.1.
    pub allow_unknown_versions: bool,
    /// Headers that may not carry conflicting duplicate values.
    pub framing_singleton_headers: &'static [&'static str],
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_header_count: 64,
            max_head_bytes: 8 * 1024,
            allow_lf_without_cr: false,
            allow_lenient_start_line: false,
            allow_obs_fold: true,
            allow_te_with_content_length: false,
            allow_unknown_versions: false,
            framing_singleton_headers: FRAMING_SINGLETON_HEADERS,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_header_count(mut self, max: usize) -> Self {
        self.max_header_count = max;
        self
    }

    pub fn with_max_head_bytes(mut self, max: usize) -> Self {
        self.max_head_bytes = max;
        self
    }

    pub fn with_lf_without_cr(mut self, allow: bool) -> Self {
        self.allow_lf_without_cr = allow;
        self
    }

    pub fn with_lenient_start_line(mut self, allow: bool) -> Self {
        self.allow_lenient_start_line = allow;
        self
    }

    pub fn with_obs_fold(mut self, allow: bool) -> Self {
        self.allow_obs_fold = allow;
        self
    }

    pub fn with_te_with_content_length(mut self, allow: bool) -> Self {
        self.allow_te_with_content_length = allow;
        self
    }

    pub fn with_unknown_versions(mut self, allow: bool) -> Self {
        self.allow_unknown_versions = allow;
        self
    }

    pub(crate) fn is_framing_singleton(&self, lowercase_name: &str) -> bool {
        self.framing_singleton_headers.contains(&lowercase_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let config = ParserConfig::default();
        assert_eq!(config.max_header_count, 64);
        assert_eq!(config.max_head_bytes, 8 * 1024);
        assert!(!config.allow_lf_without_cr);
        assert!(!config.allow_te_with_content_length);
        assert!(config.allow_obs_fold);
        assert!(config.is_framing_singleton("content-length"));
        assert!(!config.is_framing_singleton("host"));
    }

    #[test]
    fn builder_style_updates() {
        let config = ParserConfig::new().with_max_header_count(4).with_lf_without_cr(true);
        assert_eq!(config.max_header_count, 4);
        assert!(config.allow_lf_without_cr);
    }
}
