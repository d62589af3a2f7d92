//! The seam between the connection engine and whatever produces responses.
//!
//! The connection owns the request and the [`RequestMetrics`] record; a [`Handler`]
//! receives the complete request and may annotate the metrics (normalized path, content
//! preference) before returning one response.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Response;

use crate::protocol::{HandlerError, ParsedRequest, RequestMetrics};

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: ParsedRequest, metrics: &mut RequestMetrics) -> Result<Response<Bytes>, HandlerError>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(
        &self,
        request: ParsedRequest,
        metrics: &mut RequestMetrics,
    ) -> Result<Response<Bytes>, HandlerError> {
        (**self).call(request, metrics).await
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(ParsedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, HandlerError>> + Send,
{
    async fn call(
        &self,
        request: ParsedRequest,
        _metrics: &mut RequestMetrics,
    ) -> Result<Response<Bytes>, HandlerError> {
        (self.f)(request).await
    }
}

/// Adapts an async function of the request into a [`Handler`].
pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(ParsedRequest) -> Fut,
    Fut: Future<Output = Result<Response<Bytes>, HandlerError>>,
{
    HandlerFn { f }
}
