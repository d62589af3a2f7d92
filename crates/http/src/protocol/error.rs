use http::StatusCode;
use std::error::Error;
use std::io;
use thiserror::Error;

/// Boxed error returned by request handlers.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },
}

/// Every way reading one request off the wire can fail.
///
/// The session matches on this exhaustively to pick the response status, see
/// [`ParseError::status`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line too long, exceeds the limit {limit}")]
    LineTooLong { limit: usize },

    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    #[error("header too large: {reason}")]
    HeaderTooLarge { reason: String },

    #[error("not implemented: {reason}")]
    NotImplemented { reason: String },

    #[error("http version not supported: {version}")]
    HttpVersionNotSupported { version: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn line_too_long(limit: usize) -> Self {
        Self::LineTooLong { limit }
    }

    pub fn bad_request<S: ToString>(str: S) -> Self {
        Self::BadRequest { reason: str.to_string() }
    }

    pub fn header_too_large<S: ToString>(str: S) -> Self {
        Self::HeaderTooLarge { reason: str.to_string() }
    }

    pub fn not_implemented<S: ToString>(str: S) -> Self {
        Self::NotImplemented { reason: str.to_string() }
    }

    pub fn version_not_supported<S: ToString>(version: S) -> Self {
        Self::HttpVersionNotSupported { version: version.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Builds an io error of kind `UnexpectedEof`, used when the peer hangs up mid-message.
    pub fn unexpected_eof(msg: &'static str) -> Self {
        Self::io(io::Error::new(io::ErrorKind::UnexpectedEof, msg))
    }

    /// The response status for this error, or `None` when the connection should be
    /// dropped without answering.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ParseError::LineTooLong { .. } | ParseError::HeaderTooLarge { .. } => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            ParseError::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
            ParseError::NotImplemented { .. } => Some(StatusCode::NOT_IMPLEMENTED),
            ParseError::HttpVersionNotSupported { .. } => Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED),
            ParseError::Io { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_response<S: ToString>(str: S) -> Self {
        Self::InvalidResponse { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Failure reported by a [`Handler`](crate::handler::Handler).
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request was well framed but its target could not be understood.
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    /// Anything else; the message never reaches the client.
    #[error("handler failed: {source}")]
    Internal {
        #[from]
        source: BoxError,
    },
}

impl HandlerError {
    pub fn bad_request<S: ToString>(str: S) -> Self {
        Self::BadRequest { reason: str.to_string() }
    }

    pub fn internal<E: Into<BoxError>>(e: E) -> Self {
        Self::Internal { source: e.into() }
    }
}
