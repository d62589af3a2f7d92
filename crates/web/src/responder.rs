//! Conversions from handler values into responses.
//!
//! [`Responder`] lets handlers build bodies from strings, JSON values and status
//! tuples without assembling headers by hand.

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use serde::Serialize;
use tinyhttp::protocol::status_response;
use tracing::error;

const TEXT_UTF_8: &str = "text/plain; charset=utf-8";
const JSON_UTF_8: &str = "application/json; charset=utf-8";

pub trait Responder {
    fn into_response(self) -> Response<Bytes>;
}

impl Responder for Response<Bytes> {
    fn into_response(self) -> Response<Bytes> {
        self
    }
}

impl Responder for &'static str {
    fn into_response(self) -> Response<Bytes> {
        with_content_type(Bytes::from_static(self.as_bytes()), TEXT_UTF_8)
    }
}

impl Responder for String {
    fn into_response(self) -> Response<Bytes> {
        with_content_type(Bytes::from(self), TEXT_UTF_8)
    }
}

impl Responder for StatusCode {
    fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = self;
        response
    }
}

/// Sets the status of whatever `T` renders.
impl<T: Responder> Responder for (StatusCode, T) {
    fn into_response(self) -> Response<Bytes> {
        let (status, responder) = self;
        let mut response = responder.into_response();
        *response.status_mut() = status;
        response
    }
}

/// A body serialized with `serde_json`.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn into_response(self) -> Response<Bytes> {
        match serde_json::to_vec(&self.0) {
            Ok(mut body) => {
                body.push(b'\n');
                with_content_type(Bytes::from(body), JSON_UTF_8)
            }
            Err(e) => {
                error!(cause = %e, "serialize json response error");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn with_content_type(body: Bytes, content_type: &'static str) -> Response<Bytes> {
    let mut response = Response::new(body);
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
