//! Parsed request types.
//!
//! [`RequestHead`] is what the header decoder yields once the blank line after the
//! headers has been read; [`ParsedRequest`] joins it with the decoded body before the
//! request is handed to a handler.

use bytes::Bytes;
use http::Method;

use crate::protocol::{HeaderSet, PayloadSize};

/// The only protocol version this engine speaks.
pub const HTTP_11: &str = "HTTP/1.1";

/// Request line, headers and the framing chosen for the body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    target: String,
    headers: HeaderSet,
    payload_size: PayloadSize,
}

impl RequestHead {
    pub(crate) fn new(method: Method, target: String, headers: HeaderSet, payload_size: PayloadSize) -> Self {
        Self { method, target, headers, payload_size }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw target: an origin-form path with optional query, or `*`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Always `HTTP/1.1`; anything else is rejected while parsing.
    pub fn version(&self) -> &'static str {
        HTTP_11
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// True when the client asked for `Expect: 100-continue`.
    pub fn expects_continue(&self) -> bool {
        self.headers.first("expect").is_some_and(|value| value.trim().eq_ignore_ascii_case("100-continue"))
    }

    /// True when the client sent `Connection: close`.
    pub fn wants_close(&self) -> bool {
        self.headers.has_token("connection", "close")
    }

    /// Attaches the decoded body.
    pub fn body(self, body: Bytes) -> ParsedRequest {
        ParsedRequest { head: self, body }
    }
}

/// One complete request: head plus body.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    head: RequestHead,
    body: Bytes,
}

impl ParsedRequest {
    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn target(&self) -> &str {
        self.head.target()
    }

    pub fn version(&self) -> &'static str {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderSet {
        self.head.headers()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_parts(self) -> (RequestHead, Bytes) {
        (self.head, self.body)
    }
}
