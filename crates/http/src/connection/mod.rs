//! Connection handling.
//!
//! [`HttpConnection`] runs the keep-alive loop of one accepted connection:
//! parse, dispatch to a [`Handler`](crate::handler::Handler), write the response and
//! decide whether to continue. Every read and write is bounded by the timeouts in
//! [`ConnectionLimits`](crate::ConnectionLimits).

mod http_connection;

pub use http_connection::HttpConnection;
