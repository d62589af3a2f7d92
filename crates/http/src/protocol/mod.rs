//! Core HTTP protocol types.
//!
//! - **Headers** ([`HeaderSet`]): case-insensitive, order-preserving multi-map
//!
//! - **Messages** ([`message`]): what the request decoder yields
//!   - [`Message`]: either the request head or the complete body
//!   - [`PayloadSize`]: the body framing chosen from the head
//!
//! - **Requests** ([`RequestHead`], [`ParsedRequest`]) and their [`Url`]
//!
//! - **Responses** ([`ResponseMessage`]): a `Response<Bytes>` plus the keep-alive
//!   decision for the turn
//!
//! - **Errors** ([`error`]): the tagged error kinds of parsing, sending and handling
//!   - [`ParseError::status`] maps each parse failure to its response status
//!
//! - **Metrics** ([`RequestMetrics`]): per-request record behind the access log

mod header_set;
pub use header_set::HeaderSet;

pub mod message;
pub use message::Message;
pub use message::PayloadSize;

mod request;
pub use request::{HTTP_11, ParsedRequest, RequestHead};

mod response;
pub use response::{ConnectionDirective, ResponseMessage, status_response};

mod url;
pub use url::{MAX_QUERY_PAIRS, Url, UrlError, pct_decode};

mod metrics;
pub use metrics::RequestMetrics;

pub mod error;
pub use error::BoxError;
pub use error::HandlerError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
