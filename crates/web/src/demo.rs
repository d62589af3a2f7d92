//! The routes the `tinyhttp-server` binary serves out of the box.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;
use serde_json::{Value, json};
use tinyhttp::protocol::BoxError;

use crate::handler::{ResponseMetadata, RouteHandler, handler_fn};
use crate::request::RequestContext;
use crate::responder::{Json, Responder};
use crate::router::{Router, get, post};

/// `GET /hello[?name=..]`, as text or as JSON when the client asks for it.
#[derive(Debug)]
struct Hello;

impl Hello {
    fn message(ctx: &RequestContext) -> String {
        match ctx.query("name") {
            Some(name) => format!("hello {name}"),
            None => "hello world".to_owned(),
        }
    }

    fn render(ctx: &RequestContext) -> Response<Bytes> {
        let message = Self::message(ctx);
        if ctx.wants_json() {
            Json(json!({ "message": message })).into_response()
        } else {
            format!("{message}\n").into_response()
        }
    }
}

#[async_trait]
impl RouteHandler for Hello {
    async fn handle(&self, ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
        Ok(Self::render(&ctx))
    }

    fn metadata(&self, ctx: &RequestContext) -> ResponseMetadata {
        let response = Self::render(ctx);
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| ResponseMetadata::default().content_type, str::to_owned);
        ResponseMetadata { content_type, content_length: response.body().len() as u64 }
    }
}

async fn user(ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
    let id = ctx.path_var("id").unwrap_or_default();
    Ok(Json(json!({ "id": id })).into_response())
}

/// Echoes the body back, re-serialized when it is JSON and the client wants JSON.
async fn echo(ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
    let content_type = ctx.header("content-type").unwrap_or("application/octet-stream");

    if ctx.wants_json() && content_type.contains("application/json") {
        let value: Value = serde_json::from_slice(ctx.body())?;
        return Ok(Json(value).into_response());
    }

    let mut response = Response::new(ctx.body().clone());
    response.headers_mut().insert(http::header::CONTENT_TYPE, http::HeaderValue::try_from(content_type)?);
    Ok(response)
}

async fn debug_config(ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
    let config = ctx.config();
    Ok(Json(json!({
        "logFormat": config.log_format.as_str(),
        "maxRequestsPerConn": config.max_requests_per_conn,
    }))
    .into_response())
}

/// Builds the demo route table. `started` anchors the uptime reported by `/health`.
pub fn router(started: Instant) -> Router {
    let health = handler_fn(move |ctx: RequestContext| async move {
        let config = ctx.config();
        let uptime_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok::<_, BoxError>(Json(json!({
            "status": "up",
            "uptimeMs": uptime_ms,
            "port": config.port,
            "workerThreads": config.worker_threads,
            "queueCapacity": config.queue_capacity,
            "keepAliveIdleTimeoutMs": config.keep_alive_idle_timeout_ms,
        }))
        .into_response())
    });

    Router::builder()
        .route("/hello", get(Hello))
        .route("/users/:id", get(handler_fn(user)))
        .route("/echo", post(handler_fn(echo)))
        .route("/health", get(health))
        .route("/debug/config", get(handler_fn(debug_config)))
        .build()
}
