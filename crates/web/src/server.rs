//! The dispatch service: turns one parsed request into one response.
//!
//! [`WebService`] is the [`Handler`] the connection engine calls. It normalises the
//! target, answers `OPTIONS` from the route table and the CORS policy, resolves
//! everything else through the [`Router`], and tells `404` apart from `405`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use tinyhttp::handler::Handler;
use tinyhttp::protocol::{HandlerError, HeaderSet, ParsedRequest, RequestMetrics, Url, status_response};
use tracing::debug;

use crate::config::ServerConfig;
use crate::cors::CorsPolicy;
use crate::handler::ResponseMetadata;
use crate::request::{RequestContext, wants_json};
use crate::responder::Responder;
use crate::router::{Router, allow_header};

#[derive(Debug)]
pub struct WebService {
    router: Router,
    cors: CorsPolicy,
    config: Arc<ServerConfig>,
}

impl WebService {
    pub fn new(router: Router, config: Arc<ServerConfig>) -> Self {
        let cors = config.cors_policy();
        Self { router, cors, config }
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn options(&self, url: &Url, request_headers: &HeaderSet, preflight: bool) -> Response<Bytes> {
        let server_wide = matches!(url.path(), "*" | "/");
        let allowed =
            if server_wide { self.router.server_methods() } else { self.router.allowed_methods(url.path()) };

        if !server_wide && !self.router.matches_path(url.path()) {
            return not_found(url);
        }

        let mut response = StatusCode::NO_CONTENT.into_response();
        if let Ok(allow) = HeaderValue::try_from(allow_header(&allowed)) {
            response.headers_mut().insert(ALLOW, allow);
        }
        if preflight {
            self.cors.apply_preflight(request_headers, response.headers_mut());
        } else {
            self.cors.apply_actual(request_headers, response.headers_mut());
        }
        response
    }

    fn no_route(&self, url: &Url) -> Response<Bytes> {
        let allowed = self.router.allowed_methods(url.path());
        if allowed.len() <= 1 {
            return not_found(url);
        }

        let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
        if let Ok(allow) = HeaderValue::try_from(allow_header(&allowed)) {
            response.headers_mut().insert(ALLOW, allow);
        }
        response
    }
}

fn not_found(url: &Url) -> Response<Bytes> {
    (StatusCode::NOT_FOUND, format!("No route: {}\n", url.path())).into_response()
}

/// Headers only; the connection writes no body for `HEAD`.
fn head_response(metadata: &ResponseMetadata) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    if let Ok(content_type) = HeaderValue::try_from(metadata.content_type.as_str()) {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(metadata.content_length));
    response
}

#[async_trait]
impl Handler for WebService {
    async fn call(
        &self,
        request: ParsedRequest,
        metrics: &mut RequestMetrics,
    ) -> Result<Response<Bytes>, HandlerError> {
        metrics.prefers_json = wants_json(request.headers());

        let url = Url::parse(request.target()).map_err(HandlerError::bad_request)?;
        metrics.path = url.path().to_owned();

        if *request.method() == Method::OPTIONS {
            let preflight = CorsPolicy::is_preflight(request.method(), request.headers());
            return Ok(self.options(&url, request.headers(), preflight));
        }

        let Some(matched) = self.router.resolve(request.method(), url.path()) else {
            debug!(method = %request.method(), path = url.path(), "no route");
            return Ok(self.no_route(&url));
        };

        let handler = matched.handler();
        let is_head = *request.method() == Method::HEAD;
        let request_headers = request.headers().clone();
        let ctx = RequestContext::new(request, url, matched.into_captures(), Arc::clone(&self.config));

        let mut response = if is_head {
            head_response(&handler.metadata(&ctx))
        } else {
            handler.handle(ctx).await.map_err(HandlerError::internal)?
        };

        self.cors.apply_actual(&request_headers, response.headers_mut());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::{Bytes, BytesMut};
    use http::header::{ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_LENGTH, VARY};
    use http::{Response, StatusCode};
    use indoc::indoc;
    use tinyhttp::codec::RequestDecoder;
    use tinyhttp::handler::Handler;
    use tinyhttp::protocol::{BoxError, HandlerError, Message, ParsedRequest, RequestMetrics};
    use tokio_util::codec::Decoder;

    use super::WebService;
    use crate::config::ServerConfig;
    use crate::handler::{MockRouteHandler, ResponseMetadata, handler_fn};
    use crate::request::RequestContext;
    use crate::router::{Router, any, get, post};

    fn parse(raw: &str) -> ParsedRequest {
        let mut decoder = RequestDecoder::default();
        let mut bytes = BytesMut::from(raw);
        let Some(Message::Header(head)) = decoder.decode(&mut bytes).unwrap() else { panic!("expected request head") };
        let Some(Message::Payload(body)) = decoder.decode(&mut bytes).unwrap() else { panic!("expected request body") };
        head.body(body)
    }

    async fn call(service: &WebService, raw: &str) -> (Result<Response<Bytes>, HandlerError>, RequestMetrics) {
        let request = parse(raw);
        let mut metrics = RequestMetrics::start(request.method().clone(), request.target(), request.headers(), None);
        let result = service.call(request, &mut metrics).await;
        (result, metrics)
    }

    async fn user(ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
        let id = ctx.path_var("id").unwrap_or_default();
        Ok(Response::new(Bytes::from(format!("user {id}\n"))))
    }

    async fn fail(_ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
        Err("database down".into())
    }

    fn service() -> WebService {
        let router = Router::builder()
            .route("/users/:id", get(handler_fn(user)))
            .route("/users", post(handler_fn(user)))
            .route("/fail", get(handler_fn(fail)))
            .route("/cors", any(handler_fn(user)))
            .build();
        WebService::new(router, Arc::new(ServerConfig::default()))
    }

    async fn service_call(raw: &str) -> (Result<Response<Bytes>, HandlerError>, RequestMetrics) {
        call(&service(), raw).await
    }

    #[tokio::test]
    async fn resolves_route_with_capture() {
        let (result, metrics) = service_call("GET /users/42?x=1 HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let response = result.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"user 42\n");
        assert_eq!(metrics.path, "/users/42");
        assert!(!metrics.prefers_json);
    }

    #[tokio::test]
    async fn method_not_allowed_lists_allow() {
        let (result, _) = service_call("DELETE /users/42 HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let response = result.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET,HEAD,OPTIONS");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (result, metrics) = service_call("GET /nothing HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let response = result.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"No route: /nothing\n");
        assert_eq!(metrics.path, "/nothing");
    }

    #[tokio::test]
    async fn traversal_is_bad_request() {
        let (result, _) = service_call("GET /users/../etc HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(matches!(result, Err(HandlerError::BadRequest { .. })));

        let (result, _) = service_call("GET /users/%2e%2e/etc HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(matches!(result, Err(HandlerError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn handler_failure_is_internal() {
        let (result, _) = service_call("GET /fail HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(matches!(result, Err(HandlerError::Internal { .. })));
    }

    #[tokio::test]
    async fn options_star_lists_server_methods() {
        let (result, _) = service_call("OPTIONS * HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let response = result.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ALLOW], "GET,POST,HEAD,OPTIONS");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn options_on_path() {
        let (result, _) = service_call("OPTIONS /users HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let response = result.unwrap();
        assert_eq!(response.headers()[ALLOW], "POST,OPTIONS");

        let (result, _) = service_call("OPTIONS /cors HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert_eq!(result.unwrap().status(), StatusCode::NO_CONTENT);

        let (result, _) = service_call("OPTIONS /nothing HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert_eq!(result.unwrap().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers() {
        let raw = indoc! {"
            OPTIONS /users HTTP/1.1\r
            Host: x\r
            Origin: https://a.example\r
            Access-Control-Request-Method: POST\r
            \r
        "};
        let (result, _) = service_call(raw).await;
        let response = result.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET,POST,HEAD,OPTIONS");
        assert_eq!(response.headers()[ALLOW], "POST,OPTIONS");
    }

    #[tokio::test]
    async fn actual_response_gets_cors_headers() {
        let raw = indoc! {"
            GET /users/1 HTTP/1.1\r
            Host: x\r
            Origin: https://a.example\r
            Accept: application/json\r
            \r
        "};
        let (result, metrics) = service_call(raw).await;
        let response = result.unwrap();

        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[VARY], "Origin, Accept");
        assert!(metrics.prefers_json);
    }

    #[tokio::test]
    async fn head_uses_metadata_only() {
        let mut handler = MockRouteHandler::new();
        handler
            .expect_metadata()
            .times(1)
            .returning(|_| ResponseMetadata { content_type: "application/json".into(), content_length: 42 });
        handler.expect_handle().never();

        let router = Router::builder().route("/report", get(handler)).build();
        let service = WebService::new(router, Arc::new(ServerConfig::default()));

        let (result, _) = call(&service, "HEAD /report HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let response = result.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "42");
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "application/json");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn get_calls_handle() {
        let mut handler = MockRouteHandler::new();
        handler.expect_metadata().never();
        handler.expect_handle().times(1).returning(|ctx| {
            assert_eq!(ctx.query("name"), Some("ada"));
            Ok(Response::new(Bytes::from_static(b"hi")))
        });

        let router = Router::builder().route("/hello", get(handler)).build();
        let service = WebService::new(router, Arc::new(ServerConfig::default()));

        let (result, _) = call(&service, "GET /hello?name=ada HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert_eq!(result.unwrap().body().as_ref(), b"hi");
    }
}
