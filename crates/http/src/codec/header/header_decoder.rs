//! Request line and header field decoding.
//!
//! The decoder is incremental: it consumes complete lines as they become available and
//! keeps the partially parsed head between calls, so a slow client that delivers one
//! header line per packet costs no re-scanning. Every ceiling from [`ParserLimits`] is
//! checked on the way in; nothing is buffered past a limit.
//!
//! # Rules
//!
//! - The request line has exactly three fields: method, target, version
//! - The version is `HTTP/1.1`, the target is `*` or starts with `/`
//! - Obsolete line folding is rejected
//! - At least one `Host`, and every `Host` value is identical
//! - `Content-Length` and `Transfer-Encoding` never appear together

use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::wire_reader::read_line;
use crate::limits::ParserLimits;
use crate::protocol::{HTTP_11, HeaderSet, ParseError, PayloadSize, RequestHead};
use crate::utils::ensure;

/// Decoder for one request head.
///
/// Yields a [`RequestHead`] whose [`PayloadSize`] tells the caller how to read the body.
#[derive(Debug)]
pub struct HeaderDecoder {
    limits: ParserLimits,
    state: State,
}

#[derive(Debug)]
enum State {
    RequestLine,
    Fields(PartialHead),
}

#[derive(Debug)]
struct PartialHead {
    method: Method,
    target: String,
    headers: HeaderSet,
    total: usize,
    count: usize,
}

impl HeaderDecoder {
    pub fn new(limits: ParserLimits) -> Self {
        Self { limits, state: State::RequestLine }
    }

    /// True while no byte of the next head has been consumed.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::RequestLine)
    }
}

fn decode_request_line(limits: &ParserLimits, line: &str) -> Result<PartialHead, ParseError> {
    let mut fields = line.split_ascii_whitespace();
    let (Some(method), Some(target), Some(version), None) = (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ParseError::bad_request("malformed request line"));
    };

    ensure!(version == HTTP_11, ParseError::version_not_supported(version));
    ensure!(target == "*" || target.starts_with('/'), ParseError::bad_request("invalid request target"));
    ensure!(target.len() <= limits.target, ParseError::header_too_large("request target too long"));

    let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::bad_request("invalid method"))?;

    Ok(PartialHead { method, target: target.to_owned(), headers: HeaderSet::with_capacity(16), total: 0, count: 0 })
}

fn decode_field(limits: &ParserLimits, head: &mut PartialHead, line: &str, wire_len: usize) -> Result<(), ParseError> {
    head.total += wire_len;
    ensure!(head.total <= limits.headers_total, ParseError::header_too_large("headers too large"));

    head.count += 1;
    ensure!(head.count <= limits.header_count, ParseError::header_too_large("too many headers"));

    ensure!(!line.starts_with([' ', '\t']), ParseError::bad_request("obsolete line folding"));

    let Some((name, value)) = line.split_once(':') else {
        return Err(ParseError::bad_request("header without colon"));
    };
    let name = name.trim();
    ensure!(!name.is_empty(), ParseError::bad_request("empty header name"));

    head.headers.append(name, value.trim());
    Ok(())
}

impl Decoder for HeaderDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let head = match &mut self.state {
                State::RequestLine => {
                    let Some(line) = read_line(src, self.limits.request_line)? else {
                        return Ok(None);
                    };
                    trace!(request_line = %line.text, "read request line");
                    self.state = State::Fields(decode_request_line(&self.limits, &line.text)?);
                    continue;
                }
                State::Fields(head) => head,
            };

            let line = match read_line(src, self.limits.header_line) {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(ParseError::LineTooLong { .. }) => return Err(ParseError::header_too_large("header line too long")),
                Err(e) => return Err(e),
            };

            if !line.text.is_empty() {
                decode_field(&self.limits, head, &line.text, line.wire_len)?;
                continue;
            }

            if let State::Fields(head) = std::mem::replace(&mut self.state, State::RequestLine) {
                return finish(&self.limits, head).map(Some);
            }
        }
    }
}

fn finish(limits: &ParserLimits, head: PartialHead) -> Result<RequestHead, ParseError> {
    check_host(&head.headers)?;
    let payload_size = parse_payload(limits, &head.headers)?;
    trace!(method = %head.method, target = %head.target, ?payload_size, "decoded request head");
    Ok(RequestHead::new(head.method, head.target, head.headers, payload_size))
}

fn check_host(headers: &HeaderSet) -> Result<(), ParseError> {
    let hosts = headers.all("host");
    let Some(first) = hosts.first() else {
        return Err(ParseError::bad_request("missing Host header"));
    };
    ensure!(hosts.iter().all(|host| host == first), ParseError::bad_request("conflicting Host headers"));
    Ok(())
}

/// Selects the body framing from `Content-Length` and `Transfer-Encoding`.
fn parse_payload(limits: &ParserLimits, headers: &HeaderSet) -> Result<PayloadSize, ParseError> {
    let te = headers.all("transfer-encoding");
    let cl = headers.all("content-length");

    match (te.is_empty(), cl.is_empty()) {
        (true, true) => Ok(PayloadSize::Empty),

        (false, true) => {
            let coding = te.join(",");
            if coding.trim().eq_ignore_ascii_case("chunked") {
                Ok(PayloadSize::Chunked)
            } else if coding.trim().eq_ignore_ascii_case("identity") {
                Ok(PayloadSize::Empty)
            } else {
                Err(ParseError::not_implemented(format!("transfer-encoding {coding}")))
            }
        }

        (true, false) => {
            let first = &cl[0];
            ensure!(
                cl.iter().all(|value| value == first),
                ParseError::bad_request("conflicting Content-Length headers")
            );
            ensure!(
                !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit()),
                ParseError::bad_request(format!("invalid Content-Length {first}"))
            );

            let length = first.parse::<u64>().map_err(|_| ParseError::bad_request("Content-Length out of range"))?;
            ensure!(
                length <= limits.body,
                ParseError::bad_request(format!("Content-Length {length} exceeds {}", limits.body))
            );
            match length {
                0 => Ok(PayloadSize::Empty),
                n => Ok(PayloadSize::Length(n)),
            }
        }

        (false, false) => Err(ParseError::bad_request("both Content-Length and Transfer-Encoding present")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decode(input: &str) -> Result<Option<RequestHead>, ParseError> {
        let mut buf = BytesMut::from(input);
        HeaderDecoder::new(ParserLimits::default()).decode(&mut buf)
    }

    fn decode_with(limits: ParserLimits, input: &str) -> Result<Option<RequestHead>, ParseError> {
        let mut buf = BytesMut::from(input);
        HeaderDecoder::new(limits).decode(&mut buf)
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let head = decode(str).unwrap().unwrap();

        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.target(), "/index.html");
        assert_eq!(head.version(), "HTTP/1.1");
        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.headers().first("host"), Some("127.0.0.1:8080"));
        assert_eq!(head.headers().first("user-agent"), Some("curl/7.79.1"));
        assert!(head.payload_size().is_empty());
    }

    #[test]
    fn leaves_body_bytes_in_buffer() {
        let mut bytes = BytesMut::from("POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 3\r\n\r\n123");
        let head = HeaderDecoder::new(ParserLimits::default()).decode(&mut bytes).unwrap().unwrap();

        assert_eq!(head.payload_size(), PayloadSize::Length(3));
        assert_eq!(&bytes[..], b"123");
    }

    #[test]
    fn resumes_across_partial_input() {
        let mut decoder = HeaderDecoder::new(ParserLimits::default());
        let mut buf = BytesMut::from("GET /a HTTP/1.1\r\nHo");

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert!(!decoder.is_idle());

        buf.extend_from_slice(b"st: x\r\n\r\n");
        let head = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(head.headers().first("host"), Some("x"));
        assert!(decoder.is_idle());
    }

    #[test]
    fn trims_names_and_values() {
        let head = decode("GET / HTTP/1.1\r\nHost:   x  \r\nX-Empty:\r\n\r\n").unwrap().unwrap();
        assert_eq!(head.headers().first("host"), Some("x"));
        assert_eq!(head.headers().first("x-empty"), Some(""));
    }

    #[test]
    fn asterisk_target() {
        let head = decode("OPTIONS * HTTP/1.1\r\nHost: x\r\n\r\n").unwrap().unwrap();
        assert_eq!(head.method(), &Method::OPTIONS);
        assert_eq!(head.target(), "*");
    }

    #[test]
    fn wrong_field_count() {
        assert!(matches!(decode("GET /\r\nHost: x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
        assert!(matches!(decode("GET / HTTP/1.1 extra\r\nHost: x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn unsupported_version() {
        let result = decode("GET / HTTP/1.0\r\nHost: x\r\n\r\n");
        assert!(matches!(result, Err(ParseError::HttpVersionNotSupported { version }) if version == "HTTP/1.0"));
    }

    #[test]
    fn target_must_be_origin_form() {
        assert!(matches!(decode("GET http://x/ HTTP/1.1\r\nHost: x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
        assert!(matches!(decode("GET ** HTTP/1.1\r\nHost: x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn long_target() {
        let limits = ParserLimits { target: 8, ..ParserLimits::default() };
        let result = decode_with(limits, "GET /abcdefghi HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(matches!(result, Err(ParseError::HeaderTooLarge { .. })));
    }

    #[test]
    fn long_request_line() {
        let limits = ParserLimits { request_line: 16, ..ParserLimits::default() };
        let result = decode_with(limits, "GET /abcdefghijklmnop HTTP/1.1\r\n");
        assert!(matches!(result, Err(ParseError::LineTooLong { limit: 16 })));
    }

    #[test]
    fn invalid_method() {
        assert!(matches!(decode("G(T / HTTP/1.1\r\nHost: x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn obsolete_folding() {
        let result = decode("GET / HTTP/1.1\r\nHost: x\r\nX-A: 1\r\n  continued\r\n\r\n");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn header_without_colon_or_name() {
        assert!(matches!(decode("GET / HTTP/1.1\r\nHost x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
        assert!(matches!(decode("GET / HTTP/1.1\r\n: x\r\n\r\n"), Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn header_line_over_limit() {
        let limits = ParserLimits { header_line: 32, ..ParserLimits::default() };
        let line = format!("GET / HTTP/1.1\r\nHost: x\r\nX-Long: {}\r\n\r\n", "a".repeat(64));
        let result = decode_with(limits, &line);
        let err = result.unwrap_err();
        assert!(matches!(err, ParseError::HeaderTooLarge { .. }));
        assert_eq!(err.status(), Some(http::StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE));
    }

    #[test]
    fn too_many_headers() {
        let limits = ParserLimits { header_count: 2, ..ParserLimits::default() };
        let result = decode_with(limits, "GET / HTTP/1.1\r\nHost: x\r\nA: 1\r\nB: 2\r\n\r\n");
        assert!(matches!(result, Err(ParseError::HeaderTooLarge { .. })));
    }

    #[test]
    fn headers_total_over_limit() {
        let limits = ParserLimits { headers_total: 20, ..ParserLimits::default() };
        let result = decode_with(limits, "GET / HTTP/1.1\r\nHost: x\r\nA: 1234567890\r\n\r\n");
        assert!(matches!(result, Err(ParseError::HeaderTooLarge { .. })));
    }

    #[test]
    fn host_rules() {
        assert!(matches!(decode("GET / HTTP/1.1\r\nAccept: */*\r\n\r\n"), Err(ParseError::BadRequest { .. })));
        assert!(matches!(decode("GET / HTTP/1.1\r\nHost: a\r\nHost: b\r\n\r\n"), Err(ParseError::BadRequest { .. })));
        assert!(decode("GET / HTTP/1.1\r\nHost: a\r\nhost: a\r\n\r\n").unwrap().is_some());
    }

    #[test]
    fn framing_selection() {
        let chunked = decode("POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: Chunked\r\n\r\n").unwrap().unwrap();
        assert!(chunked.payload_size().is_chunked());

        let identity = decode("POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: identity\r\n\r\n").unwrap().unwrap();
        assert!(identity.payload_size().is_empty());

        let zero = decode("POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\n\r\n").unwrap().unwrap();
        assert!(zero.payload_size().is_empty());

        let get_with_body = decode("GET / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\n").unwrap().unwrap();
        assert_eq!(get_with_body.payload_size(), PayloadSize::Length(5));
    }

    #[test]
    fn unsupported_transfer_coding() {
        let result = decode("POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: gzip, chunked\r\n\r\n");
        assert!(matches!(result, Err(ParseError::NotImplemented { .. })));
    }

    #[test]
    fn both_framings_in_either_order() {
        let cl_first = "POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\n";
        let te_first = "POST / HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\nContent-Length: 5\r\n\r\n";
        assert!(matches!(decode(cl_first), Err(ParseError::BadRequest { .. })));
        assert!(matches!(decode(te_first), Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn invalid_content_length() {
        for value in ["-1", "+5", "abc", "1 2", "99999999999999999999999"] {
            let input = format!("POST / HTTP/1.1\r\nHost: x\r\nContent-Length: {value}\r\n\r\n");
            assert!(matches!(decode(&input), Err(ParseError::BadRequest { .. })), "{value}");
        }

        let limits = ParserLimits { body: 10, ..ParserLimits::default() };
        let result = decode_with(limits, "POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 11\r\n\r\n");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));

        let conflicting = "POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n";
        assert!(matches!(decode(conflicting), Err(ParseError::BadRequest { .. })));
    }
}
