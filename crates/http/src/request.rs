use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use http::{Method, Uri, Version};
use httparse::Status;
use thiserror::Error;

/// One framed HTTP/1.0 request.
///
/// The request owns a copy of its bytes, so it outlives the receive buffer it
/// was cut from. `headers_offset` points just past the request line,
/// `body_offset` at the first body byte when the request has a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    content: Bytes,
    headers_offset: usize,
    body_offset: Option<usize>,
}

/// The parsed first line of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestLineError {
    #[error("invalid request head: {reason}")]
    InvalidHead { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,
}

impl RequestLineError {
    pub fn invalid_head<S: ToString>(str: S) -> Self {
        Self::InvalidHead { reason: str.to_string() }
    }
}

impl HttpRequest {
    pub fn new(content: Bytes, headers_offset: usize, body_offset: Option<usize>) -> Self {
        Self { content, headers_offset, body_offset }
    }

    /// All bytes of the request, request line to last body byte
    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.content
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[inline]
    pub fn headers_offset(&self) -> usize {
        self.headers_offset
    }

    #[inline]
    pub fn body_offset(&self) -> Option<usize> {
        self.body_offset
    }

    /// Request line and header block, including the terminating empty line.
    pub fn head(&self) -> &[u8] {
        &self.content[..self.body_offset.unwrap_or(self.content.len())]
    }

    /// [`head`](Self::head) as text, invalid UTF-8 is replaced.
    pub fn header_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.head())
    }

    pub fn body(&self) -> Bytes {
        match self.body_offset {
            Some(offset) => self.content.slice(offset..),
            None => Bytes::new(),
        }
    }

    /// The body as text, empty when there is no body.
    pub fn body_str(&self) -> Cow<'_, str> {
        match self.body_offset {
            Some(offset) => String::from_utf8_lossy(&self.content[offset..]),
            None => Cow::Borrowed(""),
        }
    }

    /// The request line including its CRLF, without any header.
    pub fn line(&self) -> &[u8] {
        &self.content[..self.headers_offset.min(self.content.len())]
    }

    /// Parses method, target and version of the request line.
    ///
    /// Only the first line is looked at, headers never affect the result.
    ///
    /// # Errors
    ///
    /// Fails when the line is not valid HTTP/1.x or the version is neither
    /// 1.0 nor 1.1.
    pub fn request_line(&self) -> Result<RequestLine, RequestLineError> {
        // the line alone followed by an empty line is a complete head without headers
        let mut head = Vec::with_capacity(self.line().len() + 2);
        head.extend_from_slice(self.line());
        head.extend_from_slice(b"\r\n");

        let mut req = httparse::Request::new(&mut []);

        match req.parse(&head).map_err(RequestLineError::invalid_head)? {
            Status::Complete(_) => {}
            Status::Partial => return Err(RequestLineError::invalid_head("incomplete head")),
        }

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(RequestLineError::InvalidVersion(v)),
        };
        let method = req
            .method
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
            .ok_or(RequestLineError::InvalidMethod)?;
        let uri = req.path.and_then(|p| p.parse::<Uri>().ok()).ok_or(RequestLineError::InvalidUri)?;

        Ok(RequestLine { method, uri, version })
    }

    /// Decodes the query string of the request target.
    ///
    /// A missing or malformed query yields an empty map; for repeated names the
    /// last value wins.
    pub fn query_params(&self) -> HashMap<String, String> {
        let Ok(RequestLine { uri, .. }) = self.request_line() else {
            return HashMap::new();
        };

        uri.query()
            .and_then(|query| serde_urlencoded::from_str::<HashMap<String, String>>(query).ok())
            .unwrap_or_default()
    }
}

impl From<HttpRequest> for Bytes {
    fn from(request: HttpRequest) -> Self {
        request.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(raw: &'static str, body: Option<usize>) -> HttpRequest {
        let headers_offset = raw.find("\r\n").unwrap() + 2;
        HttpRequest::new(Bytes::from_static(raw.as_bytes()), headers_offset, body)
    }

    #[test]
    fn header_only_request() {
        let request = request("GET /?a=1&b=2 HTTP/1.0\r\nHost: localhost\r\n\r\n", None);

        assert_eq!(request.headers_offset(), 24);
        assert_eq!(request.header_str(), "GET /?a=1&b=2 HTTP/1.0\r\nHost: localhost\r\n\r\n");
        assert_eq!(request.body_str(), "");
        assert!(request.body().is_empty());
    }

    #[test]
    fn request_with_body() {
        let request = request("POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\nhello", Some(38));

        assert_eq!(request.header_str(), "POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\n");
        assert_eq!(request.body_str(), "hello");
        assert_eq!(&request.body()[..], b"hello");
    }

    #[test]
    fn parses_request_line() {
        let line = request("POST /submit?x=1 HTTP/1.1\r\n\r\n", None).request_line().unwrap();

        assert_eq!(line.method, Method::POST);
        assert_eq!(line.uri.path(), "/submit");
        assert_eq!(line.uri.query(), Some("x=1"));
        assert_eq!(line.version, Version::HTTP_11);
    }

    #[test]
    fn rejects_malformed_request_line() {
        let result = request("GARBAGE\r\n\r\n", None).request_line();

        assert!(matches!(result, Err(RequestLineError::InvalidHead { .. })));
    }

    #[test]
    fn request_line_ignores_headers() {
        let mut raw = String::from("GET /search?q=1 HTTP/1.0\r\n");
        for i in 0..65 {
            raw.push_str(&format!("X-H{i}: v\r\n"));
        }
        raw.push_str("Host : x\r\n\r\n");
        let request = HttpRequest::new(Bytes::from(raw), 26, None);

        assert_eq!(request.line(), b"GET /search?q=1 HTTP/1.0\r\n");
        let line = request.request_line().unwrap();
        assert_eq!(line.method, Method::GET);
        assert_eq!(line.uri.path(), "/search");
        assert_eq!(line.version, Version::HTTP_10);
        assert_eq!(request.query_params()["q"], "1");
    }

    #[test]
    fn query_params_are_decoded() {
        let params = request("GET /search?q=hello%20world&page=2&page=3 HTTP/1.0\r\n\r\n", None).query_params();

        assert_eq!(params.len(), 2);
        assert_eq!(params["q"], "hello world");
        assert_eq!(params["page"], "3");
    }

    #[test]
    fn missing_query_yields_no_params() {
        assert!(request("GET / HTTP/1.0\r\n\r\n", None).query_params().is_empty());
        assert!(request("NOT HTTP\r\n\r\n", None).query_params().is_empty());
    }
}
