//! Case-insensitive header field store and the one-line-at-a-time parser
//! that feeds it.

use std::collections::HashMap;

use thiserror::Error;

/// Errors produced while parsing a single header line.
///
/// This mirrors the granularity of the request parser's own error enum:
/// every rejection names the exact token that failed so the connection
/// boundary can surface it verbatim as a 400 body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header name: {0}")]
    InvalidName(String),
}

type Result<T> = std::result::Result<T, HeaderError>;

const TOKEN_PUNCTUATION: &[u8] = b"!#$%&'*+-.^_`|~";

fn is_token_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || TOKEN_PUNCTUATION.contains(&c)
}

fn is_valid_token(data: &[u8]) -> bool {
    !data.is_empty() && data.iter().all(|&c| is_token_char(c))
}

/// A case-insensitive multi-map of header name to (possibly coalesced) value.
///
/// Every key stored here is already the lowercase form of a valid token, and
/// every value has been trimmed of leading/trailing ASCII whitespace; callers
/// never see raw, un-normalized header text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    /// Create an empty header block.
    pub fn new() -> Self {
        Headers(HashMap::new())
    }

    /// Look up a header by name, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Unconditionally replace the value for `key`, bypassing coalescing.
    pub fn override_header(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Insert a header value, coalescing with any existing value for the
    /// same (lowercased) name by joining with `", "` in arrival order.
    pub fn set(&mut self, key: &str, value: impl AsRef<str>) {
        let key = key.to_ascii_lowercase();
        let value = value.as_ref();
        match self.0.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                self.0.insert(key, value.to_string());
            }
        }
    }

    /// Iterate over the stored `(lowercase name, value)` pairs. Iteration
    /// order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a single header line out of `data`.
    ///
    /// Returns `(bytes_consumed, done)`. `done` is true once the empty line
    /// terminating the header block has been consumed. A `bytes_consumed`
    /// of `0` (with `Ok`) means the caller needs to supply more data before
    /// a full line is available.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool)> {
        let idx = match find_crlf(data) {
            Some(idx) => idx,
            None => return Ok((0, false)),
        };

        if idx == 0 {
            return Ok((2, true));
        }

        let line = &data[..idx];
        let colon = match line.iter().position(|&b| b == b':') {
            Some(pos) => pos,
            None => return Err(HeaderError::InvalidName(lossy(line))),
        };
        let raw_name = &line[..colon];
        let raw_value = &line[colon + 1..];

        if raw_name != trim_trailing_space(raw_name) {
            return Err(HeaderError::InvalidName(lossy(raw_name)));
        }

        let name = trim_ascii(raw_name);
        if !is_valid_token(name) {
            return Err(HeaderError::InvalidName(lossy(name)));
        }
        let name = String::from_utf8_lossy(name).to_ascii_lowercase();

        let value = String::from_utf8_lossy(trim_ascii(raw_value)).into_owned();

        self.set(&name, value);

        Ok((idx + 2, false))
    }

    /// The default headers attached to demo responses: `Content-Length`,
    /// `Connection: close`, `Content-Type: text/plain`.
    pub fn default_response_headers(content_length: usize) -> Headers {
        let mut h = Headers::new();
        h.set("Content-Length", content_length.to_string());
        h.set("Connection", "close");
        h.set("Content-Type", "text/plain");
        h
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

fn trim_trailing_space(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && data[end - 1] == b' ' {
        end -= 1;
    }
    &data[..end]
}

fn trim_ascii(data: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = data.len();
    while start < end && data[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && data[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    &data[start..end]
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}
