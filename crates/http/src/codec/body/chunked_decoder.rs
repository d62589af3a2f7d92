//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! Implements the chunked coding of
//! [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1): each chunk is a
//! hex size line (extensions after `;` are ignored), the data, and a CRLF. A zero size ends
//! the body; trailer fields up to the blank line are read and discarded.
//!
//! The chunks are joined into one contiguous body whose running total is checked against
//! the same ceiling as `Content-Length` bodies.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::wire_reader::read_line;
use crate::limits::ParserLimits;
use crate::protocol::ParseError;
use crate::utils::ensure;
use ChunkedState::*;

#[derive(Debug)]
pub struct ChunkedDecoder {
    limits: ParserLimits,
    state: ChunkedState,
    body: BytesMut,
    total: u64,
    trailer_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size line
    Size,
    /// Read chunk data
    Data { remaining: u64 },
    /// Read the CRLF after chunk data
    DataCrlf,
    /// Read and discard trailer fields
    Trailer,
    /// The blank line after the trailers was read
    End,
}

impl ChunkedDecoder {
    pub fn new(limits: ParserLimits) -> Self {
        Self { limits, state: Size, body: BytesMut::new(), total: 0, trailer_bytes: 0 }
    }

    fn read_size(&mut self, src: &mut BytesMut) -> Result<Option<ChunkedState>, ParseError> {
        let Some(line) = read_line(src, self.limits.chunk_line)? else {
            return Ok(None);
        };

        let size = parse_chunk_size(&line.text, self.limits.chunk_size)?;
        if size == 0 {
            return Ok(Some(Trailer));
        }

        self.total += size;
        ensure!(self.total <= self.limits.body, ParseError::bad_request("body too large"));

        trace!(size, total = self.total, "read chunk size");
        self.body.reserve(size as usize);
        Ok(Some(Data { remaining: size }))
    }

    fn read_data(&mut self, src: &mut BytesMut, remaining: u64) -> Option<ChunkedState> {
        if src.is_empty() {
            return None;
        }

        let len = remaining.min(src.len() as u64) as usize;
        self.body.extend_from_slice(&src[..len]);
        src.advance(len);

        match remaining - len as u64 {
            0 => Some(DataCrlf),
            remaining => Some(Data { remaining }),
        }
    }

    fn read_trailer(&mut self, src: &mut BytesMut) -> Result<Option<ChunkedState>, ParseError> {
        let Some(line) = read_line(src, self.limits.chunk_line)? else {
            return Ok(None);
        };

        if line.text.is_empty() {
            return Ok(Some(End));
        }

        self.trailer_bytes += line.wire_len;
        ensure!(self.trailer_bytes <= self.limits.headers_total, ParseError::header_too_large("trailers too large"));
        Ok(Some(Trailer))
    }
}

fn read_data_crlf(src: &mut BytesMut) -> Result<Option<ChunkedState>, ParseError> {
    let missing = || ParseError::bad_request("missing CRLF after chunk");

    match src.len() {
        0 => Ok(None),
        1 => {
            ensure!(src[0] == b'\r', missing());
            Ok(None)
        }
        _ => {
            ensure!(&src[..2] == b"\r\n", missing());
            src.advance(2);
            Ok(Some(Size))
        }
    }
}

/// Parses the hex size at the start of a chunk-size line.
fn parse_chunk_size(line: &str, max: u64) -> Result<u64, ParseError> {
    let hex = line.split(';').next().unwrap_or_default().trim();

    ensure!(!hex.is_empty(), ParseError::bad_request("empty chunk size"));
    ensure!(hex.bytes().all(|b| b.is_ascii_hexdigit()), ParseError::bad_request("invalid chunk size"));

    let size = u64::from_str_radix(hex, 16).map_err(|_| ParseError::bad_request("chunk too large"))?;
    ensure!(size <= max, ParseError::bad_request("chunk too large"));
    Ok(size)
}

impl Decoder for ChunkedDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let next = match self.state {
                Size => self.read_size(src)?,
                Data { remaining } => self.read_data(src, remaining),
                DataCrlf => read_data_crlf(src)?,
                Trailer => self.read_trailer(src)?,
                End => {
                    trace!(len = self.body.len(), "finished reading chunked data");
                    self.state = Size;
                    self.total = 0;
                    self.trailer_bytes = 0;
                    return Ok(Some(self.body.split().freeze()));
                }
            };

            match next {
                Some(state) => self.state = state,
                None => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(body) = self.decode(src)? {
            return Ok(Some(body));
        }

        Err(match self.state {
            Size => ParseError::unexpected_eof("EOF before chunk size"),
            Data { .. } => ParseError::unexpected_eof("EOF in chunked data"),
            DataCrlf => ParseError::bad_request("missing CRLF after chunk"),
            Trailer | End => ParseError::unexpected_eof("EOF in trailers"),
        })
    }
}
