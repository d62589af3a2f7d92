//! Per-request observability record.
//!
//! A [`RequestMetrics`] is created by the connection for every request, lent to the
//! handler by `&mut`, and consumed by [`RequestMetrics::log_access`] once the response
//! is written. It never outlives the request and is never shared between connections.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use http::{Method, StatusCode};
use tracing::info;
use uuid::Uuid;

use crate::protocol::HeaderSet;

/// Longest client supplied `X-Request-Id` that is reused as is.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub remote: Option<SocketAddr>,
    pub started: Instant,
    pub status: Option<StatusCode>,
    pub bytes: u64,
    pub prefers_json: bool,
}

impl RequestMetrics {
    /// Starts the record for a request. The request id is taken from `X-Request-Id` when
    /// the client sent a usable one, otherwise generated.
    pub fn start(method: Method, target: &str, headers: &HeaderSet, remote: Option<SocketAddr>) -> Self {
        Self {
            request_id: request_id(headers),
            method,
            path: target.split('?').next().unwrap_or(target).to_owned(),
            remote,
            started: Instant::now(),
            status: None,
            bytes: 0,
            prefers_json: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records what was written for this request.
    pub fn finish(&mut self, status: StatusCode, bytes: u64) {
        self.status = Some(status);
        self.bytes = bytes;
    }

    /// Emits the access log entry on the `access` target.
    pub fn log_access(&self) {
        let remote = self.remote.map(|addr| addr.to_string()).unwrap_or_else(|| "-".to_owned());
        info!(
            target: "access",
            remote = %remote,
            method = %self.method,
            path = %self.path,
            status = self.status.map_or(0, |status| status.as_u16()),
            bytes = self.bytes,
            duration_ms = self.elapsed().as_millis() as u64,
            request_id = %self.request_id,
            json = self.prefers_json,
        );
    }
}

fn request_id(headers: &HeaderSet) -> String {
    match headers.first("x-request-id") {
        Some(id) if !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic()) => {
            id.to_owned()
        }
        _ => Uuid::new_v4().simple().to_string(),
    }
}
