use bytes::Bytes;

/// One item produced by the request decoder.
///
/// A request arrives as a `Header` followed, when its framing announces a body, by
/// exactly one `Payload` carrying the complete body.
#[derive(Debug)]
pub enum Message<T> {
    /// The parsed request head
    Header(T),
    /// The fully decoded body
    Payload(Bytes),
}

impl<T> Message<T> {
    /// Returns true if this message contains payload data
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Returns true if this message contains header information
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Converts the message into its body if it carries one
    pub fn into_payload(self) -> Option<Bytes> {
        match self {
            Message::Header(_) => None,
            Message::Payload(bytes) => Some(bytes),
        }
    }
}

/// The body framing selected for a request.
///
/// - Known length: read exactly that many bytes
/// - Chunked: decode the chunked transfer coding
/// - Empty: no body follows the head
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}
