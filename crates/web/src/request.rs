//! What a route handler sees of a request.

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use tinyhttp::protocol::{HeaderSet, ParsedRequest, Url};

use crate::config::ServerConfig;

/// Values bound by `:name` pattern segments, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVars {
    vars: Vec<(String, String)>,
}

impl PathVars {
    pub(crate) fn insert(&mut self, name: String, value: String) {
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// The parsed request together with its normalised [`Url`], the path captures of the
/// matched route and the server configuration.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: ParsedRequest,
    url: Url,
    path_vars: PathVars,
    config: Arc<ServerConfig>,
}

impl RequestContext {
    pub fn new(request: ParsedRequest, url: Url, path_vars: PathVars, config: Arc<ServerConfig>) -> Self {
        Self { request, url, path_vars, config }
    }

    pub fn request(&self) -> &ParsedRequest {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderSet {
        self.request.headers()
    }

    /// First value of the header `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().first(name)
    }

    /// First value of the query parameter `name`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.url.query_first(name)
    }

    pub fn path_var(&self, name: &str) -> Option<&str> {
        self.path_vars.get(name)
    }

    pub fn path_vars(&self) -> &PathVars {
        &self.path_vars
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn wants_json(&self) -> bool {
        wants_json(self.headers())
    }
}

/// Whether the client's `Accept` names `application/json`.
///
/// A bare `*/*` does not count; plain text stays the default.
pub fn wants_json(headers: &HeaderSet) -> bool {
    headers.all("accept").iter().any(|accept| accept.to_ascii_lowercase().contains("application/json"))
}
