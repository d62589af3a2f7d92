//! Serialization of the response status line and header block.
//!
//! The engine owns the framing headers. They are written first in a fixed order
//! (`Date`, `Server`, `Content-Type`, `Content-Length`, `Connection`, `Keep-Alive`) and
//! any handler-supplied copy of them is skipped; the remaining handler headers follow
//! unchanged.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::header;
use tokio_util::codec::Encoder;

use crate::date::DateService;
use crate::protocol::{ConnectionDirective, ResponseMessage, SendError};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

pub const SERVER_NAME: &str = "tinyhttp";

pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Headers the encoder always writes itself.
const OWNED_HEADERS: [&str; 7] =
    ["date", "server", "content-type", "content-length", "connection", "keep-alive", "transfer-encoding"];

/// Encoder for the head of a [`ResponseMessage`].
#[derive(Debug, Default)]
pub struct HeaderEncoder;

impl Encoder<&ResponseMessage> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: &ResponseMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let response = &item.response;
        let status = response.status();

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(""))?;

        put_header(dst, b"date", &DateService::global().http_date());
        put_header(dst, b"server", SERVER_NAME.as_bytes());

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.as_bytes())
            .unwrap_or(DEFAULT_CONTENT_TYPE.as_bytes());
        put_header(dst, b"content-type", content_type);

        write!(FastWrite(dst), "content-length: {}\r\n", item.content_length())?;

        match item.connection {
            ConnectionDirective::KeepAlive { timeout, max } => {
                put_header(dst, b"connection", b"keep-alive");
                write!(FastWrite(dst), "keep-alive: timeout={}, max={}\r\n", timeout.as_secs(), max)?;
            }
            ConnectionDirective::Close => put_header(dst, b"connection", b"close"),
        }

        for (name, value) in response.headers() {
            if OWNED_HEADERS.contains(&name.as_str()) {
                continue;
            }
            put_header(dst, name.as_ref(), value.as_bytes());
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

fn put_header(dst: &mut BytesMut, name: &[u8], value: &[u8]) {
    dst.put_slice(name);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// `io::Write` over a `BytesMut`, so `write!` can format straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
