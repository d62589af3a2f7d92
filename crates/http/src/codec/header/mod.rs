//! Header block processing for requests and responses.
//!
//! - [`HeaderDecoder`]: parses the request line and header fields, validates them and
//!   selects the body framing
//! - [`HeaderEncoder`]: writes the status line and the response header block

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::{DEFAULT_CONTENT_TYPE, HeaderEncoder, SERVER_NAME};
