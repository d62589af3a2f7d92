//! Decoder for bodies framed by `Content-Length`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::wire_reader::read_exact;
use crate::protocol::ParseError;

/// Waits until exactly `length` bytes are buffered and yields them as one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    length: usize,
}

impl LengthDecoder {
    /// `length` was checked against the body limit by the header decoder.
    pub fn new(length: u64) -> Self {
        Self { length: length as usize }
    }
}

impl Decoder for LengthDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match read_exact(src, self.length) {
            Some(body) => Ok(Some(body.freeze())),
            None => {
                src.reserve(self.length - src.len());
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(body) => Ok(Some(body)),
            None => Err(ParseError::bad_request("incomplete request body")),
        }
    }
}
