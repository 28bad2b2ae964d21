//! The demo handler chain: log each request, answer with a fixed page.

use bytes::Bytes;
use micro_nio::handler::{Handler, HandlerChain, HandlerExt};
use tracing::info;

use crate::request::HttpRequest;

pub const HELLO_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Length: 51\r\n\
Content-Type: text/html\r\n\
\r\n\
<html><body>Hello FROM MicroNioServer</body></html>";

/// Logs head, body and query parameters of every request, then passes the
/// request on unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRequest;

impl Handler<HttpRequest> for LogRequest {
    type Response = HttpRequest;

    fn handle(&self, request: HttpRequest) -> Option<Self::Response> {
        info!(
            header = %request.header_str(),
            body = %request.body_str(),
            params = ?request.query_params(),
            "receiving request"
        );
        Some(request)
    }
}

/// Answers any request with the same bytes.
#[derive(Debug, Clone)]
pub struct FixedResponse {
    payload: Bytes,
}

impl FixedResponse {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into() }
    }

    /// The fixed hello page of the demo server
    pub fn hello() -> Self {
        Self::new(Bytes::from_static(HELLO_RESPONSE))
    }
}

impl<Req> Handler<Req> for FixedResponse {
    type Response = Bytes;

    fn handle(&self, _request: Req) -> Option<Self::Response> {
        Some(self.payload.clone())
    }
}

pub type DemoHandler = HandlerChain<LogRequest, FixedResponse>;

pub fn demo_handler() -> DemoHandler {
    LogRequest.and_then(FixedResponse::hello())
}
