use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::{Method, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{CONTINUE_RESPONSE, RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::limits::{ConnectionLimits, ParserLimits};
use crate::protocol::{
    ConnectionDirective, HandlerError, HttpError, Message, ParseError, ParsedRequest, RequestHead, RequestMetrics,
    ResponseMessage, SendError, status_response,
};

/// Initial capacity of the read buffer
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// One accepted connection and its keep-alive loop.
///
/// Each turn reads a request head, optionally answers `100 Continue`, reads the body,
/// hands the request to the [`Handler`] and writes the response. Reads and writes are
/// bounded by the timeouts in [`ConnectionLimits`]; a timeout ends the connection without
/// a response. Requests on one connection are strictly sequential.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    limits: ConnectionLimits,
    remote: Option<SocketAddr>,
    served: usize,
}

enum Turn {
    Continue,
    Close,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_limits(reader, writer, ParserLimits::default(), ConnectionLimits::default())
    }

    pub fn with_limits(reader: R, writer: W, parser_limits: ParserLimits, limits: ConnectionLimits) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(parser_limits), READ_BUFFER_SIZE),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            limits,
            remote: None,
            served: 0,
        }
    }

    /// Peer address reported in the access log.
    pub fn remote(mut self, remote: SocketAddr) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Serves requests until the peer closes, asks to close, a timeout fires or the
    /// per-connection request cap is reached.
    ///
    /// Malformed requests are answered with their mapped status before the error is
    /// returned; the connection is closed either way.
    pub async fn process<H: Handler + ?Sized>(mut self, handler: &H) -> Result<(), HttpError> {
        let result = loop {
            match self.serve_one(handler).await {
                Ok(Turn::Continue) => continue,
                Ok(Turn::Close) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        // best effort, the peer may already be gone
        let _ = self.framed_write.get_mut().shutdown().await;
        debug!(served = self.served, "connection closed");
        result
    }

    async fn serve_one<H: Handler + ?Sized>(&mut self, handler: &H) -> Result<Turn, HttpError> {
        let idle = if self.served == 0 { self.limits.header_read_timeout } else { self.limits.keep_alive_idle_timeout };

        let head = match timeout(idle, self.framed_read.next()).await {
            Err(_) => {
                let timeout_ms = idle.as_millis() as u64;
                debug!(timeout_ms, served = self.served, "timed out waiting for request head");
                return Ok(Turn::Close);
            }
            Ok(None) => return Ok(Turn::Close),
            Ok(Some(Err(e))) => return Err(self.reject(e).await),
            Ok(Some(Ok(Message::Header(head)))) => head,
            Ok(Some(Ok(Message::Payload(_)))) => {
                return Err(self.reject(ParseError::bad_request("request body without head")).await);
            }
        };

        if head.expects_continue() {
            self.send_continue().await?;
        }

        let Some(body) = self.read_body(&head).await? else {
            return Ok(Turn::Close);
        };

        let request = head.body(body);
        let mut metrics =
            RequestMetrics::start(request.method().clone(), request.target(), request.headers(), self.remote);

        let keep_alive =
            !request.head().wants_close() && self.served + 1 < self.limits.max_requests_per_connection;
        self.served += 1;

        let message = self.dispatch(handler, request, &mut metrics, keep_alive).await;
        let keep_alive = message.connection.is_keep_alive();

        let (status, bytes) = (message.status(), message.body_len() as u64);
        self.send(message).await?;

        metrics.finish(status, bytes);
        metrics.log_access();

        Ok(if keep_alive { Turn::Continue } else { Turn::Close })
    }

    /// Reads the body announced by `head`. `None` means the connection went away or
    /// timed out.
    async fn read_body(&mut self, head: &RequestHead) -> Result<Option<Bytes>, HttpError> {
        match timeout(self.limits.socket_read_timeout, self.framed_read.next()).await {
            Err(_) => {
                debug!(payload_size = ?head.payload_size(), "timed out reading request body");
                Ok(None)
            }
            Ok(None) => Ok(None),
            Ok(Some(Err(e))) => Err(self.reject(e).await),
            Ok(Some(Ok(Message::Payload(body)))) => Ok(Some(body)),
            Ok(Some(Ok(Message::Header(_)))) => {
                Err(self.reject(ParseError::bad_request("expected request body")).await)
            }
        }
    }

    async fn dispatch<H: Handler + ?Sized>(
        &self,
        handler: &H,
        request: ParsedRequest,
        metrics: &mut RequestMetrics,
        keep_alive: bool,
    ) -> ResponseMessage {
        let head_only = *request.method() == Method::HEAD;

        match handler.call(request, metrics).await {
            Ok(response) => {
                let connection = if keep_alive {
                    ConnectionDirective::KeepAlive {
                        timeout: self.limits.keep_alive_idle_timeout,
                        max: self.limits.max_requests_per_connection,
                    }
                } else {
                    ConnectionDirective::Close
                };
                ResponseMessage::new(response, connection).head_only(head_only)
            }
            Err(HandlerError::BadRequest { reason }) => {
                warn!(request_id = %metrics.request_id, %reason, "rejecting request target");
                ResponseMessage::new(status_response(StatusCode::BAD_REQUEST), ConnectionDirective::Close)
                    .head_only(head_only)
            }
            Err(HandlerError::Internal { source }) => {
                error!(request_id = %metrics.request_id, cause = %source, "handler failed");
                ResponseMessage::new(status_response(StatusCode::INTERNAL_SERVER_ERROR), ConnectionDirective::Close)
                    .head_only(head_only)
            }
        }
    }

    async fn send_continue(&mut self) -> Result<(), HttpError> {
        let writer = self.framed_write.get_mut();
        let write = async {
            writer.write_all(CONTINUE_RESPONSE).await?;
            writer.flush().await
        };

        match timeout(self.limits.socket_read_timeout, write).await {
            Ok(result) => result.map_err(SendError::io)?,
            Err(elapsed) => return Err(SendError::io(elapsed).into()),
        }

        info!("receive expect request header, sent continue response");
        Ok(())
    }

    async fn send(&mut self, message: ResponseMessage) -> Result<(), HttpError> {
        match timeout(self.limits.socket_read_timeout, self.framed_write.send(message)).await {
            Ok(result) => Ok(result?),
            Err(elapsed) => Err(SendError::io(elapsed).into()),
        }
    }

    /// Answers a parse failure with its mapped status, unless it was an I/O failure, and
    /// hands the error back for the caller to return.
    async fn reject(&mut self, e: ParseError) -> HttpError {
        let Some(status) = e.status() else {
            debug!(cause = %e, "connection failed mid-request");
            return e.into();
        };

        warn!(cause = %e, status = status.as_u16(), "rejecting malformed request");
        let message = ResponseMessage::new(status_response(status), ConnectionDirective::Close);
        if let Err(send_error) = self.send(message).await {
            debug!(cause = %send_error, "can't send error response");
        }
        e.into()
    }
}
