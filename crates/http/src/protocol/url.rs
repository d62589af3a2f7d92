//! Request target parsing: path normalization and query decoding.
//!
//! The path is normalized before it reaches the router: repeated slashes collapse,
//! `.` segments are dropped and `..` is refused outright instead of being resolved.
//! The same holds after decoding: `%2e%2e` and escaped slashes are refused too.
//! Percent-escapes are decoded strictly and must produce UTF-8. A `+` is a literal plus
//! sign everywhere, never a space.

use thiserror::Error;

/// Upper bound on query pairs accepted from one target.
pub const MAX_QUERY_PAIRS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("path traversal not allowed")]
    PathTraversal,

    #[error("bad percent-escape")]
    BadEscape,

    #[error("percent-decoded bytes are not utf-8")]
    InvalidUtf8,

    #[error("too many query parameters")]
    TooManyParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    raw: String,
    path: String,
    query: Vec<(String, Vec<String>)>,
}

impl Url {
    /// Parses an origin-form target (`/path?query`) or the asterisk form `*`.
    pub fn parse(target: &str) -> Result<Self, UrlError> {
        if target == "*" {
            return Ok(Self { raw: target.to_owned(), path: "*".to_owned(), query: Vec::new() });
        }

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };

        Ok(Self { raw: target.to_owned(), path: normalize_path(path)?, query: parse_query(query)? })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized path, percent-escapes left in place.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded path segments.
    pub fn segments(&self) -> impl Iterator<Item = String> + '_ {
        self.path.split('/').filter(|segment| !segment.is_empty()).filter_map(|segment| pct_decode(segment).ok())
    }

    pub fn query(&self, key: &str) -> &[String] {
        self.query.iter().find(|(name, _)| name == key).map(|(_, values)| values.as_slice()).unwrap_or(&[])
    }

    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query(key).first().map(String::as_str)
    }

    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().flat_map(|(key, values)| values.iter().map(move |value| (key.as_str(), value.as_str())))
    }
}

/// Collapses `//`, drops `.` and rejects `..`. Every segment must decode cleanly and
/// must not decode to a dot segment or contain `/`.
fn normalize_path(path: &str) -> Result<String, UrlError> {
    let mut normalized = String::with_capacity(path.len().max(1));

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(UrlError::PathTraversal),
            segment => {
                let decoded = pct_decode(segment)?;
                if matches!(decoded.as_str(), "." | "..") || decoded.contains('/') {
                    return Err(UrlError::PathTraversal);
                }
                normalized.push('/');
                normalized.push_str(segment);
            }
        }
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    Ok(normalized)
}

fn parse_query(raw: &str) -> Result<Vec<(String, Vec<String>)>, UrlError> {
    let mut query: Vec<(String, Vec<String>)> = Vec::new();
    if raw.is_empty() {
        return Ok(query);
    }

    for (index, part) in raw.split('&').enumerate() {
        if index >= MAX_QUERY_PAIRS {
            return Err(UrlError::TooManyParams);
        }

        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        let (key, value) = (pct_decode(key)?, pct_decode(value)?);

        match query.iter_mut().find(|(name, _)| *name == key) {
            Some((_, values)) => values.push(value),
            None => query.push((key, vec![value])),
        }
    }

    Ok(query)
}

/// Strict `%HH` decoding; `+` stays a plus sign.
pub fn pct_decode(input: &str) -> Result<String, UrlError> {
    if !input.contains('%') {
        return Ok(input.to_owned());
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let (Some(hi), Some(lo)) = (bytes.get(i + 1).and_then(hex), bytes.get(i + 2).and_then(hex)) else {
            return Err(UrlError::BadEscape);
        };
        out.push((hi << 4) | lo);
        i += 3;
    }

    String::from_utf8(out).map_err(|_| UrlError::InvalidUtf8)
}

fn hex(byte: &u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_and_query() {
        let url = Url::parse("/hello?name=world&x=1").unwrap();
        assert_eq!(url.path(), "/hello");
        assert_eq!(url.query_first("name"), Some("world"));
        assert_eq!(url.query_first("x"), Some("1"));
        assert_eq!(url.query_first("missing"), None);
        assert_eq!(url.raw(), "/hello?name=world&x=1");
    }

    #[test]
    fn normalizes_path() {
        assert_eq!(Url::parse("//a///b/./c/").unwrap().path(), "/a/b/c");
        assert_eq!(Url::parse("/").unwrap().path(), "/");
        assert_eq!(Url::parse("/./").unwrap().path(), "/");
    }

    #[test]
    fn rejects_traversal() {
        assert_eq!(Url::parse("/a/../etc/passwd"), Err(UrlError::PathTraversal));
        assert_eq!(Url::parse("/.."), Err(UrlError::PathTraversal));
    }

    #[test]
    fn rejects_encoded_traversal() {
        assert_eq!(Url::parse("/a/%2e%2e/b"), Err(UrlError::PathTraversal));
        assert_eq!(Url::parse("/a/.%2E"), Err(UrlError::PathTraversal));
        assert_eq!(Url::parse("/%2e/b"), Err(UrlError::PathTraversal));
        assert_eq!(Url::parse("/files/..%2Fetc%2Fpasswd"), Err(UrlError::PathTraversal));
        assert_eq!(Url::parse("/a%2Fb"), Err(UrlError::PathTraversal));
        assert_eq!(Url::parse("/v1.2/..x").unwrap().path(), "/v1.2/..x");
    }

    #[test]
    fn asterisk_form() {
        let url = Url::parse("*").unwrap();
        assert_eq!(url.path(), "*");
        assert_eq!(url.query_pairs().count(), 0);
    }

    #[test]
    fn decodes_segments_and_query() {
        let url = Url::parse("/users/J%C3%BCrgen?q=a%20b&q=c+d&flag").unwrap();
        assert_eq!(url.path(), "/users/J%C3%BCrgen");
        assert_eq!(url.segments().collect::<Vec<_>>(), vec!["users", "Jürgen"]);
        assert_eq!(url.query("q"), &["a b".to_string(), "c+d".to_string()]);
        assert_eq!(url.query_first("flag"), Some(""));
    }

    #[test]
    fn strict_escapes() {
        assert_eq!(pct_decode("%zz"), Err(UrlError::BadEscape));
        assert_eq!(pct_decode("abc%4"), Err(UrlError::BadEscape));
        assert_eq!(pct_decode("%ff"), Err(UrlError::InvalidUtf8));
        assert_eq!(Url::parse("/a%2"), Err(UrlError::BadEscape));
        assert_eq!(Url::parse("/a?k=%G1"), Err(UrlError::BadEscape));
        assert_eq!(pct_decode("100%25").unwrap(), "100%");
    }

    #[test]
    fn caps_query_pairs() {
        let at_limit = vec!["k=v"; MAX_QUERY_PAIRS].join("&");
        assert!(Url::parse(&format!("/?{at_limit}")).is_ok());

        let over = vec!["k=v"; MAX_QUERY_PAIRS + 1].join("&");
        assert_eq!(Url::parse(&format!("/?{over}")), Err(UrlError::TooManyParams));
    }
}
