//! The incremental HTTP/1.1 request-line + header parser.
//!
//! [`Request::from_reader`] owns a growable read buffer and drives the
//! three-state machine (awaiting request line → awaiting headers →
//! complete) against any [`tokio::io::AsyncRead`], tolerating arbitrary
//! byte boundaries in the underlying stream.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::headers::{HeaderError, Headers};

/// The initial read buffer size. Deliberately tiny: growing it by doubling
/// exercises the incremental-parse invariants even for single-byte reads,
/// and bounds memory at roughly twice the longest header block seen.
const INITIAL_BUFFER_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request line")]
    InvalidRequestLine,
    #[error("unsupported http version: {0}")]
    UnsupportedHttpVersion(String),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("incomplete request")]
    Incomplete,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, RequestError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    AwaitingRequestLine,
    AwaitingHeaders,
    Complete,
}

/// `METHOD SP TARGET SP HTTP/1.1`, stored verbatim once parsed. Immutable
/// for the lifetime of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub request_target: String,
    pub http_version: String,
}

/// A fully- or partially-parsed HTTP request.
#[derive(Debug)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    state: ParseState,
}

impl Request {
    fn empty() -> Self {
        Request {
            request_line: RequestLine {
                method: String::new(),
                request_target: String::new(),
                http_version: String::new(),
            },
            headers: Headers::new(),
            state: ParseState::AwaitingRequestLine,
        }
    }

    /// Read from `reader` until a complete request has been parsed,
    /// growing an internal buffer (starting at [`INITIAL_BUFFER_SIZE`],
    /// doubling when full) and compacting it after every parse step.
    pub async fn from_reader<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request> {
        let mut buf = vec![0u8; INITIAL_BUFFER_SIZE];
        let mut read_to_index = 0usize;
        let mut req = Request::empty();

        while req.state != ParseState::Complete {
            if read_to_index == buf.len() {
                buf.resize(buf.len() * 2, 0);
            }

            let n = reader.read(&mut buf[read_to_index..]).await?;
            if n > 0 {
                read_to_index += n;

                let consumed = req.parse(&buf[..read_to_index])?;
                if consumed > 0 {
                    buf.copy_within(consumed..read_to_index, 0);
                    read_to_index -= consumed;
                }
            } else {
                // Clean end-of-stream.
                break;
            }
        }

        if req.state != ParseState::Complete {
            return Err(RequestError::Incomplete);
        }

        Ok(req)
    }

    /// Repeatedly invoke [`Request::parse_single`] until it reports no
    /// further progress or the state machine reaches `Complete`.
    fn parse(&mut self, data: &[u8]) -> Result<usize> {
        let mut total = 0;
        while self.state != ParseState::Complete {
            let n = self.parse_single(&data[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize> {
        match self.state {
            ParseState::AwaitingRequestLine => match parse_request_line(data)? {
                Some((line, n)) => {
                    self.request_line = line;
                    self.state = ParseState::AwaitingHeaders;
                    Ok(n)
                }
                None => Ok(0),
            },
            ParseState::AwaitingHeaders => {
                let (n, done) = self.headers.parse(data)?;
                if done {
                    self.state = ParseState::Complete;
                }
                Ok(n)
            }
            ParseState::Complete => Ok(0),
        }
    }
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>> {
    let idx = match data.windows(2).position(|w| w == b"\r\n") {
        Some(idx) => idx,
        None => return Ok(None),
    };

    let line = &data[..idx];
    let parts: Vec<&[u8]> = line.split(|&b| b == b' ').collect();
    if parts.len() != 3 {
        return Err(RequestError::InvalidRequestLine);
    }

    let method = parts[0];
    let target = parts[1];
    let version_field = parts[2];

    let version_parts: Vec<&[u8]> = version_field.split(|&b| b == b'/').collect();
    if version_parts.len() != 2 {
        return Err(RequestError::InvalidRequestLine);
    }
    let version = version_parts[1];
    if version != b"1.1" {
        return Err(RequestError::UnsupportedHttpVersion(lossy(version)));
    }

    if method.is_empty() || !method.iter().all(|&b| b.is_ascii_uppercase()) {
        return Err(RequestError::InvalidRequestLine);
    }
    if target.is_empty() {
        return Err(RequestError::InvalidRequestLine);
    }

    let request_line = RequestLine {
        method: lossy(method),
        request_target: lossy(target),
        http_version: lossy(version),
    };

    Ok(Some((request_line, idx + 2)))
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Feeds a reader that yields bytes in chunks of `chunk_size` instead
    /// of all at once, to exercise arbitrary byte-boundary handling.
    struct Chunked<'a> {
        data: &'a [u8],
        pos: usize,
        chunk_size: usize,
    }

    impl<'a> AsyncRead for Chunked<'a> {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            let remaining = self.data.len() - self.pos;
            let n = remaining.min(self.chunk_size).min(buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn parses_request_line_and_headers() {
        let raw = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut reader = Cursor::new(raw.to_vec());
        let req = Request::from_reader(&mut reader).await.unwrap();
        assert_eq!(req.request_line.method, "GET");
        assert_eq!(req.request_line.request_target, "/x");
        assert_eq!(req.request_line.http_version, "1.1");
        assert_eq!(req.headers.get("host"), Some("a"));
    }

    #[tokio::test]
    async fn parses_correctly_when_fed_one_byte_at_a_time() {
        let raw = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut reader = Chunked {
            data: raw,
            pos: 0,
            chunk_size: 1,
        };
        let req = Request::from_reader(&mut reader).await.unwrap();
        assert_eq!(req.request_line.method, "GET");
        assert_eq!(req.request_line.request_target, "/x");
        assert_eq!(req.request_line.http_version, "1.1");
        assert_eq!(req.headers.get("host"), Some("a"));
    }

    #[tokio::test]
    async fn unsupported_http_version_fails() {
        let raw = b"GET / HTTP/2.0\r\n\r\n";
        let mut reader = Cursor::new(raw.to_vec());
        let err = Request::from_reader(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedHttpVersion(_)));
    }

    #[tokio::test]
    async fn lowercase_method_is_rejected() {
        let raw = b"get / HTTP/1.1\r\n\r\n";
        let mut reader = Cursor::new(raw.to_vec());
        let err = Request::from_reader(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidRequestLine));
    }

    #[tokio::test]
    async fn header_block_larger_than_initial_buffer_still_parses() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"GET / HTTP/1.1\r\n");
        for i in 0..20 {
            raw.extend_from_slice(format!("X-Header-{i}: value-{i}\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert!(raw.len() > INITIAL_BUFFER_SIZE);

        let mut reader = Cursor::new(raw);
        let req = Request::from_reader(&mut reader).await.unwrap();
        assert_eq!(req.headers.get("x-header-0"), Some("value-0"));
        assert_eq!(req.headers.get("x-header-19"), Some("value-19"));
    }

    #[tokio::test]
    async fn truncated_stream_is_incomplete() {
        let raw = b"GET / HTTP/1.1\r\nHost: a\r\n";
        let mut reader = Cursor::new(raw.to_vec());
        let err = Request::from_reader(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::Incomplete));
    }

    #[tokio::test]
    async fn same_request_parses_identically_for_every_chunk_size() {
        let raw = b"POST /submit HTTP/1.1\r\nHost: example.com\r\nX-Thing: 1\r\n\r\n";
        for chunk_size in 1..=raw.len() {
            let mut reader = Chunked {
                data: raw,
                pos: 0,
                chunk_size,
            };
            let req = Request::from_reader(&mut reader).await.unwrap();
            assert_eq!(req.request_line.method, "POST");
            assert_eq!(req.request_line.request_target, "/submit");
            assert_eq!(req.headers.get("host"), Some("example.com"));
            assert_eq!(req.headers.get("x-thing"), Some("1"));
        }
    }
}
