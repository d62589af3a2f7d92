//! The acceptor and its bounded worker pool.
//!
//! One accept loop hands connections to a fixed number of workers through a bounded
//! queue. The acceptor never waits on the queue: when it is full the connection gets a
//! `503 Service Unavailable` from a short-lived task and is closed. Each worker
//! owns a connection for its whole keep-alive lifetime.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use http::StatusCode;
use thiserror::Error;
use tinyhttp::codec::ResponseEncoder;
use tinyhttp::connection::HttpConnection;
use tinyhttp::protocol::{ConnectionDirective, ResponseMessage, status_response};
use tinyhttp::{ConnectionLimits, ParserLimits};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::codec::Encoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::server::WebService;

type Job = (TcpStream, SocketAddr);

const REJECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum DispatcherError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("bind {addr} error: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
}

#[derive(Debug)]
pub struct Dispatcher {
    listener: TcpListener,
    service: Arc<WebService>,
    config: Arc<ServerConfig>,
    parser_limits: ParserLimits,
}

impl Dispatcher {
    /// Binds the listening socket with `SO_REUSEADDR` and the configured backlog.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: Arc<ServerConfig>, service: WebService) -> Result<Self, DispatcherError> {
        config.validate()?;

        let addr = config.bind_addr();
        let listener = listen(addr, config.accept_backlog).map_err(|source| DispatcherError::Bind { addr, source })?;

        Ok(Self { listener, service: Arc::new(service), config, parser_limits: ParserLimits::default() })
    }

    pub fn parser_limits(mut self, parser_limits: ParserLimits) -> Self {
        self.parser_limits = parser_limits;
        self
    }

    /// The bound address; useful when the configured port is `0`.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `shutdown` is cancelled, then drains the queue and waits up to the
    /// configured grace period for in-flight connections before aborting them.
    pub async fn run(self, shutdown: CancellationToken) {
        let Self { listener, service, config, parser_limits } = self;
        let limits = config.connection_limits();

        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for id in 0..config.worker_threads {
            workers.spawn(worker(id, Arc::clone(&receiver), Arc::clone(&service), parser_limits, limits));
        }

        info!(
            addr = ?listener.local_addr().ok(),
            workers = config.worker_threads,
            queue_capacity = config.queue_capacity,
            "start listening"
        );

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => submit(&sender, stream, remote),
                    Err(e) => warn!(cause = %e, "failed to accept"),
                },
            }
        }

        info!("shutdown requested, stop accepting");
        drop(listener);
        drop(sender);

        let grace = config.shutdown_grace();
        let drained = timeout(grace, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!(cause = %e, "worker panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(remaining = workers.len(), grace_secs = grace.as_secs(), "grace period elapsed, aborting workers");
            workers.shutdown().await;
        }
        info!("server stopped");
    }
}

fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

fn submit(sender: &Sender<Job>, stream: TcpStream, remote: SocketAddr) {
    match sender.try_send((stream, remote)) {
        Ok(()) => debug!(%remote, "connection queued"),
        Err(TrySendError::Full((stream, remote))) => {
            warn!(%remote, "worker queue full, rejecting connection");
            tokio::spawn(reject_busy(stream, remote));
        }
        Err(TrySendError::Closed(_)) => debug!(%remote, "workers stopped, dropping connection"),
    }
}

/// Writes a `503` and closes. Runs off the accept loop so a slow peer can't stall it.
async fn reject_busy(mut stream: TcpStream, remote: SocketAddr) {
    let mut bytes = BytesMut::with_capacity(256);
    let message = ResponseMessage::new(status_response(StatusCode::SERVICE_UNAVAILABLE), ConnectionDirective::Close);
    if let Err(e) = ResponseEncoder::new().encode(message, &mut bytes) {
        error!(%remote, cause = %e, "render 503 response error");
        return;
    }

    match timeout(REJECT_WRITE_TIMEOUT, stream.write_all(&bytes)).await {
        Ok(Ok(())) => {
            if let Err(e) = stream.shutdown().await {
                debug!(%remote, cause = %e, "shutdown after 503 error");
            }
        }
        Ok(Err(e)) => debug!(%remote, cause = %e, "failed to write 503"),
        Err(_) => debug!(%remote, "timed out writing 503"),
    }
}

async fn worker(
    id: usize,
    queue: Arc<Mutex<Receiver<Job>>>,
    service: Arc<WebService>,
    parser_limits: ParserLimits,
    limits: ConnectionLimits,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some((stream, remote)) = next else {
            break;
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(%remote, cause = %e, "set nodelay error");
        }

        let (reader, writer) = stream.into_split();
        let connection = HttpConnection::with_limits(reader, writer, parser_limits, limits).remote(remote);
        match connection.process(service.as_ref()).await {
            Ok(()) => debug!(worker = id, %remote, "finished process, connection shutdown"),
            Err(e) => warn!(worker = id, %remote, cause = %e, "connection ended with error"),
        }
    }
    debug!(worker = id, "worker stopped");
}
