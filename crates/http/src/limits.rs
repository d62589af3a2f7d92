//! Resource ceilings for request parsing and connection handling.
//!
//! Every value here bounds memory or time a single client can consume. The defaults
//! are conservative on purpose: they resist header bombs, oversized bodies and
//! slow clients that trickle bytes to hold a worker.

use std::time::Duration;

/// Size limits enforced while reading one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Longest accepted request line, terminator included (default: `8192`).
    pub request_line: usize,
    /// Longest accepted request target (default: `4096`).
    pub target: usize,
    /// Longest accepted header line, terminator included (default: `8192`).
    pub header_line: usize,
    /// Cumulative size of all header lines (default: `65536`).
    pub headers_total: usize,
    /// Maximum number of header fields (default: `100`).
    pub header_count: usize,
    /// Largest body, for both `Content-Length` and chunked framing (default: `1_000_000`).
    pub body: u64,
    /// Longest chunk-size or trailer line (default: `8192`).
    pub chunk_line: usize,
    /// Largest single chunk (default: `0x7fff_ffff`).
    pub chunk_size: u64,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            request_line: 8192,
            target: 4096,
            header_line: 8192,
            headers_total: 64 * 1024,
            header_count: 100,
            body: 1_000_000,
            chunk_line: 8192,
            chunk_size: 0x7fff_ffff,
        }
    }
}

/// Timeouts and request caps for one keep-alive connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Time allowed for the first request head to arrive (default: `3s`).
    pub header_read_timeout: Duration,
    /// Idle time allowed between requests on a reused connection (default: `5s`).
    pub keep_alive_idle_timeout: Duration,
    /// Time allowed for reading a body or writing a response (default: `10s`).
    pub socket_read_timeout: Duration,
    /// Requests served before the connection is closed (default: `100`).
    pub max_requests_per_connection: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            header_read_timeout: Duration::from_millis(3000),
            keep_alive_idle_timeout: Duration::from_millis(5000),
            socket_read_timeout: Duration::from_millis(10_000),
            max_requests_per_connection: 100,
        }
    }
}
