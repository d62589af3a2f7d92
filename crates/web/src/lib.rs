//! Routing, CORS and a bounded worker pool on top of the `tinyhttp` engine.
//!
//! `tinyhttp` parses requests and runs keep-alive connections; this crate decides
//! what each request gets back and which connections get served at all.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::Response;
//! use tinyhttp::protocol::BoxError;
//! use tinyhttp_web::router::{get, Router};
//! use tinyhttp_web::{handler_fn, Dispatcher, RequestContext, ServerConfig, WebService};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn hello(_ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
//!     Ok(Response::new(Bytes::from_static(b"hello world\n")))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(ServerConfig::default());
//!     let router = Router::builder().route("/hello", get(handler_fn(hello))).build();
//!     let service = WebService::new(router, Arc::clone(&config));
//!
//!     let dispatcher = Dispatcher::bind(config, service).unwrap();
//!     dispatcher.run(CancellationToken::new()).await;
//! }
//! ```
//!
//! # Modules
//!
//! - [`router`]: the ordered route table with `:name` captures
//! - [`cors`]: preflight detection and CORS response headers
//! - [`dispatcher`]: the acceptor, the bounded queue and the worker pool
//! - [`config`]: flags and environment variables
//! - [`demo`]: the routes served by the `tinyhttp-server` binary

mod handler;
mod request;
mod responder;
mod server;

pub mod config;
pub mod cors;
pub mod demo;
pub mod dispatcher;
pub mod logging;
pub mod router;

pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use handler::{FnHandler, ResponseMetadata, RouteHandler, handler_fn};
pub use request::{PathVars, RequestContext, wants_json};
pub use responder::{Json, Responder};
pub use router::Router;
pub use server::WebService;
