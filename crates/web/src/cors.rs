//! Cross-origin negotiation for preflight and actual responses.

use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use http::{HeaderMap, HeaderValue, Method};
use tinyhttp::protocol::HeaderSet;

pub const ALLOWED_METHODS: &str = "GET,POST,HEAD,OPTIONS";
pub const ALLOWED_REQUEST_HEADERS: [&str; 3] = ["content-type", "authorization", "x-request-id"];
pub const MAX_AGE_SECONDS: u32 = 600;

const PREFLIGHT_VARY: &str = "Origin, Accept, Access-Control-Request-Headers, Access-Control-Request-Method";
const ACTUAL_VARY: &str = "Origin, Accept";

/// Which origins may read responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// `*` anywhere in the list means any origin.
    pub fn from_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> =
            origins.into_iter().map(Into::into).map(|o| o.trim().to_owned()).filter(|o| !o.is_empty()).collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") { Self::Any } else { Self::List(origins) }
    }
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: AllowedOrigins,
    allow_credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self { origins: AllowedOrigins::Any, allow_credentials: false }
    }
}

impl CorsPolicy {
    pub fn new(origins: AllowedOrigins, allow_credentials: bool) -> Self {
        Self { origins, allow_credentials }
    }

    /// `OPTIONS` with a non-blank `Origin` and `Access-Control-Request-Method`.
    pub fn is_preflight(method: &Method, headers: &HeaderSet) -> bool {
        method == Method::OPTIONS
            && non_blank(headers.first("origin")).is_some()
            && non_blank(headers.first("access-control-request-method")).is_some()
    }

    /// The value of `Access-Control-Allow-Origin` for `origin`, or `None` to deny.
    ///
    /// With credentials enabled a wildcard policy echoes the origin, since browsers
    /// reject `*` on credentialed responses.
    pub fn allow_origin(&self, origin: &str) -> Option<String> {
        match &self.origins {
            AllowedOrigins::Any if self.allow_credentials => Some(origin.to_owned()),
            AllowedOrigins::Any => Some("*".to_owned()),
            AllowedOrigins::List(list) => list.iter().any(|o| o == origin).then(|| origin.to_owned()),
        }
    }

    /// Headers answering a preflight.
    pub fn apply_preflight(&self, request: &HeaderSet, response: &mut HeaderMap) {
        response.insert(VARY, HeaderValue::from_static(PREFLIGHT_VARY));
        if let Some(origin) = non_blank(request.first("origin")) {
            self.apply_origin(origin, response);
        }
        response.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        response.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(MAX_AGE_SECONDS));

        if let Some(requested) = non_blank(request.first("access-control-request-headers")) {
            let allowed = filter_request_headers(requested);
            if !allowed.is_empty()
                && let Ok(value) = HeaderValue::try_from(allowed)
            {
                response.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
        }
    }

    /// Headers for an ordinary response; nothing unless the request has an `Origin`.
    pub fn apply_actual(&self, request: &HeaderSet, response: &mut HeaderMap) {
        let Some(origin) = non_blank(request.first("origin")) else {
            return;
        };
        response.insert(VARY, HeaderValue::from_static(ACTUAL_VARY));
        self.apply_origin(origin, response);
    }

    fn apply_origin(&self, origin: &str, response: &mut HeaderMap) {
        let Some(value) = self.allow_origin(origin).and_then(|o| HeaderValue::try_from(o).ok()) else {
            return;
        };
        response.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        if self.allow_credentials {
            response.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The requested headers we accept, lowercased, in request order.
fn filter_request_headers(requested: &str) -> String {
    requested
        .split(',')
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| ALLOWED_REQUEST_HEADERS.contains(&h.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}
