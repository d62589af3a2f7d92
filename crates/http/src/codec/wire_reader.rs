//! Line reading over the connection's input buffer.
//!
//! The decoders never block: they look at whatever the framed reader has buffered so far
//! and either take a complete line out of it or report that more bytes are needed. The
//! length ceiling is checked against the buffered bytes too, so a client cannot grow the
//! buffer without bound by withholding the line terminator.

use bytes::{Buf, BytesMut};

use crate::protocol::ParseError;

/// One line taken off the wire.
#[derive(Debug, PartialEq, Eq)]
pub struct Line {
    /// Line content without the terminator
    pub text: String,
    /// Bytes consumed from the buffer, terminator included
    pub wire_len: usize,
}

/// Takes the next line from `src`.
///
/// A line ends at LF; an optional CR right before it is dropped as well, so both CRLF and
/// a bare LF terminate a line. `max` bounds the line including its terminator.
///
/// Returns `Ok(None)` while the line is still incomplete, and [`ParseError::LineTooLong`]
/// once `max` bytes are buffered without a terminator among them.
pub fn read_line(src: &mut BytesMut, max: usize) -> Result<Option<Line>, ParseError> {
    let window = &src[..src.len().min(max)];

    let Some(lf) = window.iter().position(|&b| b == b'\n') else {
        if src.len() >= max {
            return Err(ParseError::line_too_long(max));
        }
        return Ok(None);
    };

    let end = if lf > 0 && src[lf - 1] == b'\r' { lf - 1 } else { lf };
    let text = std::str::from_utf8(&src[..end])
        .map_err(|_| ParseError::bad_request("line is not valid utf-8"))?
        .to_owned();

    let wire_len = lf + 1;
    src.advance(wire_len);

    Ok(Some(Line { text, wire_len }))
}

/// Takes exactly `len` bytes from `src` if they are all buffered.
pub fn read_exact(src: &mut BytesMut, len: usize) -> Option<BytesMut> {
    if src.len() < len {
        return None;
    }
    Some(src.split_to(len))
}
