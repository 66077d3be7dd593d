//! A stateful response sink wrapper that enforces the emission order
//! status-line → headers → (body | chunked-body* → trailers).

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::headers::Headers;
use crate::response::status::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Init,
    StatusWritten,
    HeadersWritten,
    BodyWritten,
    TrailersWritten,
}

impl std::fmt::Display for WriterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WriterState::Init => "init",
            WriterState::StatusWritten => "status-written",
            WriterState::HeadersWritten => "headers-written",
            WriterState::BodyWritten => "body-written",
            WriterState::TrailersWritten => "trailers-written",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("cannot {operation} in writer state {state}")]
    InvalidState {
        operation: &'static str,
        state: WriterState,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, WriterError>;

/// Wraps a byte-sink and drives it through a legal HTTP/1.1 response
/// lifecycle. Does not own the sink: its lifetime must outlive the writer.
pub struct Writer<'a, W> {
    sink: &'a mut W,
    state: WriterState,
}

impl<'a, W: AsyncWrite + Unpin> Writer<'a, W> {
    pub fn new(sink: &'a mut W) -> Self {
        Writer {
            sink,
            state: WriterState::Init,
        }
    }

    /// Emit `HTTP/1.1 <code> <reason>\r\n`. Unknown codes get an empty
    /// reason phrase but keep the trailing space before the CRLF.
    pub async fn write_status_line(&mut self, code: StatusCode) -> Result<()> {
        self.require(WriterState::Init, "write status line")?;

        let line = match code.reason_phrase() {
            Some(reason) => format!("HTTP/1.1 {} {}\r\n", code.0, reason),
            None => format!("HTTP/1.1 {} \r\n", code.0),
        };
        self.sink.write_all(line.as_bytes()).await?;
        self.state = WriterState::StatusWritten;
        Ok(())
    }

    /// Emit each `name: value\r\n` (iteration order unspecified) followed
    /// by the empty line that ends the header block.
    pub async fn write_headers(&mut self, headers: &Headers) -> Result<()> {
        self.require(WriterState::StatusWritten, "write headers")?;
        self.write_field_block(headers).await?;
        self.state = WriterState::HeadersWritten;
        Ok(())
    }

    /// Emit `bytes` verbatim as the response body.
    pub async fn write_body(&mut self, bytes: &[u8]) -> Result<usize> {
        self.require(WriterState::HeadersWritten, "write body")?;
        self.sink.write_all(bytes).await?;
        self.state = WriterState::BodyWritten;
        Ok(bytes.len())
    }

    /// Emit one chunk: `<size-in-lowercase-hex>\r\n<bytes>\r\n`.
    pub async fn write_chunked_body(&mut self, bytes: &[u8]) -> Result<usize> {
        match self.state {
            WriterState::HeadersWritten | WriterState::BodyWritten => {}
            _ => {
                return Err(WriterError::InvalidState {
                    operation: "write chunked body",
                    state: self.state,
                })
            }
        }

        let size_line = format!("{:x}\r\n", bytes.len());
        self.sink.write_all(size_line.as_bytes()).await?;
        self.sink.write_all(bytes).await?;
        self.sink.write_all(b"\r\n").await?;
        self.state = WriterState::BodyWritten;
        Ok(bytes.len())
    }

    /// Emit the literal terminating chunk `0\r\n`. Does not, by itself,
    /// append the final `\r\n` that closes the chunked section — that is
    /// always supplied by [`Writer::write_trailers`], which must be called
    /// even with an empty trailer block to reach a well-formed response.
    pub async fn write_chunked_body_done(&mut self) -> Result<()> {
        match self.state {
            WriterState::HeadersWritten | WriterState::BodyWritten => {}
            _ => {
                return Err(WriterError::InvalidState {
                    operation: "write chunked body terminator",
                    state: self.state,
                })
            }
        }

        self.sink.write_all(b"0\r\n").await?;
        self.state = WriterState::BodyWritten;
        Ok(())
    }

    /// Emit each trailer field followed by the closing `\r\n`. Pass an
    /// empty [`Headers`] block for a trailerless chunked response.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<()> {
        self.require(WriterState::BodyWritten, "write trailers")?;
        self.write_field_block(trailers).await?;
        self.state = WriterState::TrailersWritten;
        Ok(())
    }

    async fn write_field_block(&mut self, fields: &Headers) -> Result<()> {
        for (name, value) in fields.iter() {
            let line = format!("{name}: {value}\r\n");
            self.sink.write_all(line.as_bytes()).await?;
        }
        self.sink.write_all(b"\r\n").await?;
        Ok(())
    }

    fn require(&self, expected: WriterState, operation: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(WriterError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}
