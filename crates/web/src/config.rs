//! Server configuration from flags and environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use tinyhttp::ConnectionLimits;

use crate::cors::{AllowedOrigins, CorsPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Json => "json",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism().map_or(2, |n| n.get().max(2))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "tinyhttp-server", version, about = "A small HTTP/1.1 server")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on; `0` picks a free one.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "ACCEPT_BACKLOG", default_value_t = 128)]
    pub accept_backlog: u32,

    /// Connection workers; each serves one connection at a time.
    #[arg(long, env = "WORKER_THREADS", default_value_t = default_worker_threads())]
    pub worker_threads: usize,

    /// Accepted connections that may wait for a worker before new ones get `503`.
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 256)]
    pub queue_capacity: usize,

    #[arg(long, env = "HEADER_READ_TIMEOUT_MS", default_value_t = 3000)]
    pub header_read_timeout_ms: u64,

    #[arg(long, env = "KEEP_ALIVE_IDLE_TIMEOUT_MS", default_value_t = 5000)]
    pub keep_alive_idle_timeout_ms: u64,

    #[arg(long, env = "SOCKET_READ_TIMEOUT_MS", default_value_t = 10000)]
    pub socket_read_timeout_ms: u64,

    #[arg(long, env = "MAX_REQUESTS_PER_CONN", default_value_t = 100)]
    pub max_requests_per_conn: usize,

    /// How long in-flight connections may run after a shutdown signal.
    #[arg(long, env = "SHUTDOWN_GRACE_SECONDS", default_value_t = 10)]
    pub shutdown_grace_seconds: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Comma separated origins allowed by CORS, `*` for any.
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_allowed_origins: Vec<String>,

    #[arg(long, env = "CORS_ALLOW_CREDENTIALS", default_value_t = false)]
    pub cors_allow_credentials: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            accept_backlog: 128,
            worker_threads: default_worker_threads(),
            queue_capacity: 256,
            header_read_timeout_ms: 3000,
            keep_alive_idle_timeout_ms: 5000,
            socket_read_timeout_ms: 10000,
            max_requests_per_conn: 100,
            shutdown_grace_seconds: 10,
            log_format: LogFormat::Plain,
            cors_allowed_origins: vec!["*".to_owned()],
            cors_allow_credentials: false,
        }
    }
}

impl ServerConfig {
    /// Rejects values that would leave the server unable to serve anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("worker_threads", self.worker_threads),
            ("queue_capacity", self.queue_capacity),
            ("max_requests_per_conn", self.max_requests_per_conn),
        ];
        match checks.into_iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Zero { name }),
            None => Ok(()),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn connection_limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            header_read_timeout: Duration::from_millis(self.header_read_timeout_ms),
            keep_alive_idle_timeout: Duration::from_millis(self.keep_alive_idle_timeout_ms),
            socket_read_timeout: Duration::from_millis(self.socket_read_timeout_ms),
            max_requests_per_connection: self.max_requests_per_conn,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }

    pub fn cors_policy(&self) -> CorsPolicy {
        let origins = AllowedOrigins::from_list(self.cors_allowed_origins.iter().cloned());
        CorsPolicy::new(origins, self.cors_allow_credentials)
    }
}
