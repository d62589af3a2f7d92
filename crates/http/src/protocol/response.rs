//! Outgoing response types.
//!
//! Handlers build a plain `http::Response<Bytes>`; the connection wraps it in a
//! [`ResponseMessage`] that records the keep-alive decision for this turn and whether the
//! body must be suppressed (HEAD).

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};

/// What the `Connection` header of a response announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDirective {
    /// `Connection: keep-alive` plus `Keep-Alive: timeout=<secs>, max=<n>`
    KeepAlive { timeout: Duration, max: usize },
    /// `Connection: close`
    Close,
}

impl ConnectionDirective {
    pub fn is_keep_alive(&self) -> bool {
        matches!(self, ConnectionDirective::KeepAlive { .. })
    }
}

#[derive(Debug)]
pub struct ResponseMessage {
    pub response: Response<Bytes>,
    pub connection: ConnectionDirective,
    /// Write the head only. `Content-Length` is then taken from the response headers.
    pub head_only: bool,
}

impl ResponseMessage {
    pub fn new(response: Response<Bytes>, connection: ConnectionDirective) -> Self {
        Self { response, connection, head_only: false }
    }

    pub fn head_only(mut self, head_only: bool) -> Self {
        self.head_only = head_only;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Value advertised in `Content-Length`.
    pub fn content_length(&self) -> u64 {
        if self.head_only {
            let declared = self.response.headers().get(header::CONTENT_LENGTH);
            if let Some(length) = declared.and_then(|value| value.to_str().ok()).and_then(|value| value.parse().ok()) {
                return length;
            }
        }
        self.response.body().len() as u64
    }

    /// Number of body bytes that go on the wire.
    pub fn body_len(&self) -> usize {
        if self.head_only { 0 } else { self.response.body().len() }
    }
}

/// A short `text/plain` response carrying the canonical reason phrase as body.
pub fn status_response(status: StatusCode) -> Response<Bytes> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut response = Response::new(Bytes::from(format!("{reason}\n")));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
