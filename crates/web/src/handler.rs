use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;
use tinyhttp::protocol::BoxError;

use crate::request::RequestContext;

/// What a `HEAD` response announces in place of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub content_type: String,
    pub content_length: u64,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self { content_type: mime::TEXT_PLAIN.to_string(), content_length: 0 }
    }
}

/// A handler bound to a route.
///
/// `handle` produces the full response. For `HEAD` requests the server calls only
/// `metadata` and writes headers without a body, so handlers whose `GET` body is
/// cheap to size should override it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, ctx: RequestContext) -> Result<Response<Bytes>, BoxError>;

    fn metadata(&self, _ctx: &RequestContext) -> ResponseMetadata {
        ResponseMetadata::default()
    }
}

#[async_trait]
impl RouteHandler for Box<dyn RouteHandler> {
    async fn handle(&self, ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
        (**self).handle(ctx).await
    }

    fn metadata(&self, ctx: &RequestContext) -> ResponseMetadata {
        (**self).metadata(ctx)
    }
}

/// An async fn holder which implements [`RouteHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, BoxError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, BoxError>> + Send,
{
    async fn handle(&self, ctx: RequestContext) -> Result<Response<Bytes>, BoxError> {
        (self.f)(ctx).await
    }
}
