//! # Request Representation
//!
//! The router's view of one inbound request: method, path, parsed query
//! string, headers and the collected body. Values are built manually (tests,
//! non-HTTP callers) or ingested from a `hyper` request by the transport
//! layer. Everything the dispatcher reads during matching is synchronous,
//! already-available state.

use crate::error::Result;
use crate::route::Method;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::Request;
use serde_json::Value;
use std::collections::HashMap;

/// An inbound request as seen by the router
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// HTTP method
    pub method: Method,
    /// Request path (query string stripped)
    pub path: String,
    /// Raw query string (e.g., "page=1&limit=10")
    query_string: Option<String>,
    /// Decoded key/value pairs in wire order (repeated keys preserved)
    query_pairs: Vec<(String, String)>,
    /// Decoded map view; for repeated keys the last value wins
    query_params: HashMap<String, String>,
    /// Request headers
    headers: hyper::HeaderMap,
    /// Request body (collected)
    body: Option<Bytes>,
}

impl RouteRequest {
    /// Create a request manually.
    ///
    /// `target` is the path with an optional `?query` suffix.
    pub fn new(
        method: Method,
        target: impl Into<String>,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let target = target.into();
        let (path, query_string) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target, None),
        };

        let query_pairs = parse_query_pairs(query_string.as_deref());
        let query_params = query_pairs.iter().cloned().collect();

        let mut headers = hyper::HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                hyper::header::HeaderName::from_bytes(k.as_bytes()),
                hyper::header::HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Self {
            method,
            path,
            query_string,
            query_pairs,
            query_params,
            headers,
            body,
        }
    }

    /// Shorthand for a GET request with no headers or body
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target, HashMap::new(), None)
    }

    /// Ingest a hyper request, collecting the whole body
    ///
    /// # Errors
    ///
    /// Propagates body collection failures.
    pub async fn from_hyper(req: Request<hyper::body::Incoming>) -> Result<Self> {
        Self::from_hyper_with_limit(req, usize::MAX).await
    }

    /// Ingest a hyper request with a body size limit
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PayloadTooLarge`] when the declared or actual
    /// body size exceeds `max_body_size`.
    pub async fn from_hyper_with_limit(
        req: Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        // Unknown methods fall back to GET; they can only ever match GET routes
        let method = Method::parse(req.method().as_str()).unwrap_or(Method::Get);

        let uri = req.uri();
        let path = uri.path().to_string();
        let query_string = uri.query().map(String::from);

        let query_pairs = parse_query_pairs(query_string.as_deref());
        let query_params = query_pairs.iter().cloned().collect();

        let headers = req.headers().clone();
        if let Some(len) = headers.get(hyper::header::CONTENT_LENGTH) {
            if let Some(content_len) = len.to_str().ok().and_then(|s| s.parse::<usize>().ok()) {
                if content_len > max_body_size {
                    return Err(crate::error::Error::PayloadTooLarge {
                        limit: max_body_size,
                        actual: content_len,
                    });
                }
            }
        }

        let body = match BodyExt::collect(req.into_body()).await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                if bytes.len() > max_body_size {
                    return Err(crate::error::Error::PayloadTooLarge {
                        limit: max_body_size,
                        actual: bytes.len(),
                    });
                }
                Some(bytes)
            }
            Err(_) => None,
        };

        Ok(Self {
            method,
            path,
            query_string,
            query_pairs,
            query_params,
            headers,
            body,
        })
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The Content-Type header, parameters stripped
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
    }

    /// Decoded query parameters; for repeated keys the last value wins
    #[must_use]
    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Every decoded value for one query key, in wire order
    #[must_use]
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query_pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// The whole query as a JSON object of string values
    #[must_use]
    pub fn query_object(&self) -> Value {
        let map = self
            .query_params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    /// Raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// The collected request body
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_ref().map(|b| b.as_ref())
    }

    /// The request body as UTF-8 text
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Parse a query string into decoded key/value pairs, preserving order and
/// repeated keys. Also used for url-encoded form bodies.
pub(crate) fn parse_query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            q.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                    (percent_decode(key, true), percent_decode(value, true))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Percent-decode a component. `plus_as_space` applies the
/// form-encoding rule that `+` means a space (query strings only; path
/// segments keep `+` literal).
pub(crate) fn percent_decode(s: &str, plus_as_space: bool) -> String {
    let mut out = Vec::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                let hi = char::from(bytes[i + 1]).to_digit(16).unwrap_or(0) as u8;
                let lo = char::from(bytes[i + 2]).to_digit(16).unwrap_or(0) as u8;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
