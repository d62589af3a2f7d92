//! HTTP codec module for encoding and decoding HTTP messages
//!
//! - [`RequestDecoder`]: decodes requests off the wire, head first, then the body
//! - [`ResponseEncoder`]: serializes a complete response
//! - [`wire_reader`]: line and fixed-length reads over the input buffer, shared by the
//!   decoders
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use http::Response;
//! use tinyhttp::codec::ResponseEncoder;
//! use tinyhttp::protocol::{ConnectionDirective, ResponseMessage};
//! use tokio_util::codec::Encoder;
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut buffer = BytesMut::new();
//! let message = ResponseMessage::new(Response::new(Bytes::from_static(b"ok")), ConnectionDirective::Close);
//! encoder.encode(message, &mut buffer).unwrap();
//! assert!(buffer.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;
pub mod wire_reader;

pub use header::{DEFAULT_CONTENT_TYPE, SERVER_NAME};
pub use request_decoder::RequestDecoder;
pub use response_encoder::{CONTINUE_RESPONSE, ResponseEncoder};
