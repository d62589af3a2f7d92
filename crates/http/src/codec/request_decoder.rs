//! HTTP request decoder module
//!
//! Decodes one request at a time in two phases, so the connection can treat them
//! differently (separate timeouts, `100 Continue` in between):
//!
//! 1. [`HeaderDecoder`] yields [`Message::Header`] with the request head
//! 2. [`PayloadDecoder`] yields [`Message::Payload`] with the complete body, which is
//!    empty when the head announced none
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tinyhttp::codec::RequestDecoder;
//! use tinyhttp::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::default();
//! let mut buffer = BytesMut::from("GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
//!
//! let head = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(head.is_header());
//!
//! let body = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(body.into_payload().unwrap().len(), 0);
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::limits::ParserLimits;
use crate::protocol::{Message, ParseError, RequestHead};

/// A decoder for HTTP requests that handles both headers and payload
///
/// The decoder maintains its state through the `payload_decoder` field:
/// - `None`: Currently parsing headers
/// - `Some(PayloadDecoder)`: Currently parsing payload
#[derive(Debug)]
pub struct RequestDecoder {
    limits: ParserLimits,
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new(limits: ParserLimits) -> Self {
        Self { limits, header_decoder: HeaderDecoder::new(limits), payload_decoder: None }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(ParserLimits::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<RequestHead>;
    type Error = ParseError;

    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: Successfully decoded request headers
    /// - `Ok(Some(Message::Payload(_)))`: Successfully decoded the whole body
    /// - `Ok(None)`: Need more data to proceed
    /// - `Err(_)`: Encountered a parsing error
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = payload_decoder.decode(src)?.map(Message::Payload);
            if message.is_some() {
                self.payload_decoder.take();
            }
            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some(head) => {
                self.payload_decoder = Some(PayloadDecoder::new(head.payload_size(), self.limits));
                Some(Message::Header(head))
            }
            None => None,
        };

        Ok(message)
    }

    /// Called once the peer closed its side.
    ///
    /// A clean close between requests yields `Ok(None)`; a close in the middle of a head
    /// or body is an error of the kind the interrupted phase defines.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = payload_decoder.decode_eof(src)?.map(Message::Payload);
            self.payload_decoder.take();
            return Ok(message);
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() && self.header_decoder.is_idle() => Ok(None),
            None => Err(ParseError::bad_request("unexpected end of headers")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PayloadSize;
    use http::Method;
    use indoc::indoc;

    fn expect_head(decoder: &mut RequestDecoder, buf: &mut BytesMut) -> RequestHead {
        match decoder.decode(buf).unwrap() {
            Some(Message::Header(head)) => head,
            other => panic!("expected header, got {other:?}"),
        }
    }

    fn expect_body(decoder: &mut RequestDecoder, buf: &mut BytesMut) -> bytes::Bytes {
        match decoder.decode(buf).unwrap() {
            Some(Message::Payload(body)) => body,
            other => panic!("expected payload, got {other:?}"),
        }
    }

    #[test]
    fn content_length_body() {
        let mut buf = BytesMut::from("POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello");
        let mut decoder = RequestDecoder::default();

        let head = expect_head(&mut decoder, &mut buf);
        assert_eq!(head.method(), &Method::POST);
        assert_eq!(head.payload_size(), PayloadSize::Length(5));

        assert_eq!(&expect_body(&mut decoder, &mut buf)[..], b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn chunked_body() {
        let mut buf = BytesMut::from(
            "POST /echo HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
        );
        let mut decoder = RequestDecoder::default();

        expect_head(&mut decoder, &mut buf);
        assert_eq!(&expect_body(&mut decoder, &mut buf)[..], b"hello");
    }

    #[test]
    fn keep_alive_requests_back_to_back() {
        let str = indoc! {r##"
        GET /a HTTP/1.1
        Host: x

        GET /b HTTP/1.1
        Host: x

        "##};
        let mut buf = BytesMut::from(str);
        let mut decoder = RequestDecoder::default();

        assert_eq!(expect_head(&mut decoder, &mut buf).target(), "/a");
        assert!(expect_body(&mut decoder, &mut buf).is_empty());
        assert_eq!(expect_head(&mut decoder, &mut buf).target(), "/b");
        assert!(expect_body(&mut decoder, &mut buf).is_empty());
        assert!(decoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn clean_close_between_requests() {
        let mut buf = BytesMut::new();
        assert!(RequestDecoder::default().decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn close_inside_head() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: x\r\n");
        let err = RequestDecoder::default().decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::BadRequest { reason } if reason == "unexpected end of headers"));

        let mut buf = BytesMut::from("GET / HT");
        assert!(matches!(RequestDecoder::default().decode_eof(&mut buf), Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn close_inside_body() {
        let mut buf = BytesMut::from("POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 10\r\n\r\nshort");
        let mut decoder = RequestDecoder::default();

        expect_head(&mut decoder, &mut buf);
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        let err = decoder.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::BadRequest { reason } if reason == "incomplete request body"));
    }
}
