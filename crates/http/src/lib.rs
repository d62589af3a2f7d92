//! A hand-built HTTP/1.1 protocol and connection engine.
//!
//! This crate turns raw bytes from a socket into validated requests and writes
//! responses back, without delegating parsing or connection management to a framework.
//! Malformed or ambiguous input fails closed with a specific error kind, and every
//! read is bounded in size and time so hostile clients can't exhaust memory or workers.
//!
//! # Features
//!
//! - HTTP/1.1 request line and header parsing with size, count and target ceilings
//! - `Content-Length` and chunked request bodies, with a shared body ceiling
//! - Keep-alive with a per-connection request cap and distinct header, body and idle
//!   timeouts
//! - `Expect: 100-continue`
//! - A total mapping from parse failures to response statuses
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::Response;
//! use tinyhttp::connection::HttpConnection;
//! use tinyhttp::handler::make_handler;
//! use tinyhttp::protocol::ParsedRequest;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt().init();
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = std::sync::Arc::new(make_handler(|request: ParsedRequest| async move {
//!         info!(target = request.target(), "request");
//!         Ok(Response::new(Bytes::from_static(b"hello world\n")))
//!     }));
//!
//!     loop {
//!         let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer).remote(remote_addr);
//!             if let Err(e) = connection.process(&handler).await {
//!                 warn!(cause = %e, "connection ended with error");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: requests, responses, headers, URLs, error kinds and request metrics
//! - [`codec`]: the request decoder and response encoder
//! - [`connection`]: the keep-alive loop of one connection
//! - [`handler`]: the seam to whatever produces responses
//! - [`limits`]: size and time ceilings
//!
//! # Limitations
//!
//! - HTTP/1.1 only; HTTP/1.0, HTTP/2 and HTTP/3 are rejected or unsupported
//! - No TLS (use a reverse proxy for HTTPS)
//! - No pipelining: one request in flight per connection
//! - Transfer codings other than `chunked` and `identity` are answered with `501`

pub mod codec;
pub mod connection;
pub mod date;
pub mod handler;
pub mod limits;
pub mod protocol;

mod utils;

pub use limits::{ConnectionLimits, ParserLimits};
