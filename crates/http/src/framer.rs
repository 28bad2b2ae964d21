//! HTTP/1.0 request framing.
//!
//! The framer only cares about message boundaries:
//!
//! - the request line and every header line end with CRLF
//! - the header block ends at the first line that is nothing but CRLF
//! - a `Content-Length` header announces that many body bytes after the header
//!   block; the value is the run of ASCII digits following the colon and any
//!   spaces, ended by the first non-digit
//! - without `Content-Length` (or with a value of 0) the request has no body
//!
//! Chunked transfer coding and keep-alive negotiation are not supported.

use micro_nio::buffer::ElasticBuffer;
use micro_nio::connection::ConnectionId;
use micro_nio::framer::{Framer, FramerFactory};
use micro_nio::protocol::FrameError;
use tracing::trace;

use crate::request::HttpRequest;

/// Maximum size in bytes allowed for the request line plus header block
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

const CRLF: &[u8] = b"\r\n";
const CONTENT_LENGTH: &[u8] = b"content-length";

/// Frames HTTP/1.0 requests out of one connection's byte stream.
#[derive(Debug, Clone)]
pub struct HttpFramer {
    max_header_bytes: usize,
}

impl HttpFramer {
    pub fn new() -> Self {
        Self::with_max_header_bytes(DEFAULT_MAX_HEADER_BYTES)
    }

    pub fn with_max_header_bytes(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }

    #[inline]
    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }
}

impl Default for HttpFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer for HttpFramer {
    type Item = HttpRequest;

    /// Extracts one request from the front of `src`.
    ///
    /// Nothing is removed until the header block and the announced body are
    /// both complete. Bytes after the request stay in `src`.
    ///
    /// # Errors
    ///
    /// - [`FrameError::TooLargeHeader`] when the head exceeds `max_header_bytes`
    /// - [`FrameError::InvalidContentLength`] when `Content-Length` has no
    ///   digits or does not fit in `usize`
    fn decode(&mut self, src: &mut ElasticBuffer) -> Result<Option<Self::Item>, FrameError> {
        let Some(head) = scan_head(&src[..], self.max_header_bytes)? else {
            return Ok(None);
        };

        let total = head
            .body_offset
            .checked_add(head.content_length)
            .ok_or_else(|| FrameError::invalid_content_length("message length overflows"))?;
        if src.len() < total {
            trace!(buffered = src.len(), expected = total, "waiting for body");
            return Ok(None);
        }

        let content = src.take_message(total);
        let body_offset = (head.content_length > 0).then_some(head.body_offset);
        trace!(length = total, content_length = head.content_length, retained = src.len(), "framed http request");

        Ok(Some(HttpRequest::new(content, head.headers_offset, body_offset)))
    }
}

/// Creates one [`HttpFramer`] per connection.
#[derive(Debug, Clone)]
pub struct HttpFramerFactory {
    max_header_bytes: usize,
}

impl HttpFramerFactory {
    pub fn new() -> Self {
        Self::with_max_header_bytes(DEFAULT_MAX_HEADER_BYTES)
    }

    pub fn with_max_header_bytes(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }
}

impl Default for HttpFramerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FramerFactory for HttpFramerFactory {
    type Framer = HttpFramer;

    fn create(&self, connection_id: ConnectionId) -> Self::Framer {
        trace!(connection = %connection_id, "create http framer");
        HttpFramer::with_max_header_bytes(self.max_header_bytes)
    }
}

/// Boundaries of a complete request head.
#[derive(Debug, PartialEq, Eq)]
struct Head {
    /// First byte after the request line
    headers_offset: usize,
    /// First byte after the empty line ending the header block
    body_offset: usize,
    content_length: usize,
}

fn scan_head(buf: &[u8], max_header_bytes: usize) -> Result<Option<Head>, FrameError> {
    let Some(headers_offset) = next_line_end(buf, 0) else {
        return partial(buf, max_header_bytes);
    };

    let mut content_length = 0;
    let mut line_start = headers_offset;
    loop {
        let Some(line_end) = next_line_end(buf, line_start) else {
            return partial(buf, max_header_bytes);
        };

        if line_end - line_start == CRLF.len() {
            if line_end > max_header_bytes {
                return Err(FrameError::too_large_header(line_end, max_header_bytes));
            }
            return Ok(Some(Head { headers_offset, body_offset: line_end, content_length }));
        }

        if let Some(value) = content_length_value(&buf[line_start..line_end - CRLF.len()]) {
            content_length = parse_content_length(value)?;
        }
        line_start = line_end;
    }
}

/// The head is incomplete, which is fine as long as it may still fit.
fn partial(buf: &[u8], max_header_bytes: usize) -> Result<Option<Head>, FrameError> {
    if buf.len() > max_header_bytes {
        return Err(FrameError::too_large_header(buf.len(), max_header_bytes));
    }
    Ok(None)
}

/// Index just past the next CRLF at or after `from`.
fn next_line_end(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?.windows(CRLF.len()).position(|window| window == CRLF).map(|i| from + i + CRLF.len())
}

/// The raw value of a `Content-Length` header line, name matched case-insensitively.
fn content_length_value(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|b| *b == b':')?;
    line[..colon].eq_ignore_ascii_case(CONTENT_LENGTH).then(|| &line[colon + 1..])
}

fn parse_content_length(value: &[u8]) -> Result<usize, FrameError> {
    let digits: &[u8] = {
        let start = value.iter().position(|b| *b != b' ').unwrap_or(value.len());
        let value = &value[start..];
        let end = value.iter().position(|b| !b.is_ascii_digit()).unwrap_or(value.len());
        &value[..end]
    };

    if digits.is_empty() {
        return Err(FrameError::invalid_content_length("missing digits"));
    }

    digits.iter().try_fold(0usize, |length, digit| {
        length
            .checked_mul(10)
            .and_then(|length| length.checked_add(usize::from(digit - b'0')))
            .ok_or_else(|| FrameError::invalid_content_length("value overflows"))
    })
}
