//! Request body decoding.
//!
//! - [`ChunkedDecoder`](chunked_decoder::ChunkedDecoder): the chunked transfer coding
//! - [`LengthDecoder`](length_decoder::LengthDecoder): bodies framed by `Content-Length`
//! - [`PayloadDecoder`]: dispatches to one of the above, or yields an empty body
//!
//! Every decoder yields the complete body as a single `Bytes`.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
