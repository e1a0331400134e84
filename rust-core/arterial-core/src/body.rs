//! # Body Parsing
//!
//! Normalizes request payloads into a field mapping plus uploaded files.
//! JSON bodies go through simd-json, url-encoded forms reuse the query
//! parser, and multipart payloads stream through `multer`. Parsing is the
//! dispatcher's only suspension point; everything downstream of it is
//! synchronous CPU work.
//!
//! Parsing behavior is governed by an explicit [`BodyParseConfig`] handed to
//! the router at construction; there is no process-global configuration.

use crate::binding::lookup_path;
use crate::error::{Error, Result};
use crate::request::{parse_query_pairs, RouteRequest};
use futures_util::future::ready;
use futures_util::stream::once;
use hyper::body::Bytes;
use serde_json::Value;
use tracing::warn;

/// Limits applied while parsing request bodies
#[derive(Debug, Clone)]
pub struct BodyParseConfig {
    /// Maximum accepted payload size in bytes
    pub max_body_size: usize,
    /// Maximum number of form/multipart fields
    pub max_fields: usize,
}

impl Default for BodyParseConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            max_fields: 256,
        }
    }
}

/// One uploaded file from a multipart payload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field name
    pub name: String,
    /// Client-supplied file name
    pub filename: Option<String>,
    /// Declared content type of the part
    pub content_type: Option<String>,
    /// File contents
    pub data: Bytes,
}

/// A parsed request body: the field mapping plus any uploaded files
#[derive(Debug, Clone, Default)]
pub struct ParsedBody {
    /// Normalized payload; `Null` for an empty body, an object for forms
    pub root: Value,
    /// Uploaded files (multipart only)
    pub files: Vec<UploadedFile>,
}

impl ParsedBody {
    /// An empty body
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: Value::Null,
            files: Vec::new(),
        }
    }

    /// Look up a field by dotted path
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.root, path)
    }
}

/// Parse the request body according to its content type.
///
/// `application/json` (and `+json` suffixes), url-encoded forms and
/// multipart are supported; a missing content type is treated as JSON when a
/// body is present. An absent or empty body normalizes to [`ParsedBody::empty`].
///
/// # Errors
///
/// Returns [`Error::PayloadTooLarge`] over the configured limit,
/// [`Error::MalformedBody`] for undecodable payloads or unsupported content
/// types.
pub async fn parse_body(request: &RouteRequest, config: &BodyParseConfig) -> Result<ParsedBody> {
    let Some(bytes) = request.body_bytes() else {
        return Ok(ParsedBody::empty());
    };
    if bytes.is_empty() {
        return Ok(ParsedBody::empty());
    }
    if bytes.len() > config.max_body_size {
        return Err(Error::PayloadTooLarge {
            limit: config.max_body_size,
            actual: bytes.len(),
        });
    }

    let result = match request.content_type() {
        Some("application/x-www-form-urlencoded") => parse_form(bytes, config),
        Some(ct) if ct.starts_with("multipart/") => {
            // multer needs the full header value for the boundary parameter
            let header = request.header("content-type").unwrap_or(ct);
            parse_multipart(header, bytes, config).await
        }
        Some(ct) if ct == "application/json" || ct.ends_with("+json") => parse_json(bytes),
        None => parse_json(bytes),
        Some(other) => Err(Error::MalformedBody {
            reason: format!("unsupported content type: {other}"),
        }),
    };

    if let Err(e) = &result {
        warn!(error = %e, "request body rejected");
    }
    result
}

/// JSON fast path: simd-json over a scratch copy of the payload.
fn parse_json(bytes: &[u8]) -> Result<ParsedBody> {
    let mut scratch = bytes.to_vec();
    let root: Value = simd_json::from_slice(&mut scratch).map_err(|e| Error::MalformedBody {
        reason: e.to_string(),
    })?;
    Ok(ParsedBody {
        root,
        files: Vec::new(),
    })
}

/// Url-encoded form: decoded pairs become an object of string fields.
fn parse_form(bytes: &[u8], config: &BodyParseConfig) -> Result<ParsedBody> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::MalformedBody {
        reason: "form body is not valid UTF-8".to_string(),
    })?;

    let pairs = parse_query_pairs(Some(text));
    if pairs.len() > config.max_fields {
        return Err(Error::MalformedBody {
            reason: format!("more than {} form fields", config.max_fields),
        });
    }

    let fields = pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Ok(ParsedBody {
        root: Value::Object(fields),
        files: Vec::new(),
    })
}

/// Multipart: text parts become fields, file parts are captured whole.
async fn parse_multipart(
    content_type: &str,
    bytes: &[u8],
    config: &BodyParseConfig,
) -> Result<ParsedBody> {
    let boundary = multer::parse_boundary(content_type).map_err(|e| Error::MalformedBody {
        reason: e.to_string(),
    })?;

    let stream = once(ready(Ok::<Bytes, std::io::Error>(Bytes::copy_from_slice(
        bytes,
    ))));
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = serde_json::Map::new();
    let mut files = Vec::new();
    let mut count = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(Error::MalformedBody {
                    reason: e.to_string(),
                })
            }
        };

        count += 1;
        if count > config.max_fields {
            return Err(Error::MalformedBody {
                reason: format!("more than {} multipart fields", config.max_fields),
            });
        }

        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() {
            let filename = field.file_name().map(ToString::to_string);
            let part_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(|e| Error::MalformedBody {
                reason: e.to_string(),
            })?;
            files.push(UploadedFile {
                name,
                filename,
                content_type: part_type,
                data,
            });
        } else {
            let text = field.text().await.map_err(|e| Error::MalformedBody {
                reason: e.to_string(),
            })?;
            fields.insert(name, Value::String(text));
        }
    }

    Ok(ParsedBody {
        root: Value::Object(fields),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Method;
    use serde_json::json;
    use std::collections::HashMap;

    fn request(content_type: Option<&str>, body: &[u8]) -> RouteRequest {
        let mut headers = HashMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type".to_string(), ct.to_string());
        }
        RouteRequest::new(
            Method::Post,
            "/items",
            headers,
            Some(Bytes::copy_from_slice(body)),
        )
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = request(Some("application/json"), br#"{"name": "ab", "count": 3}"#);
        let body = parse_body(&req, &BodyParseConfig::default()).await.unwrap();
        assert_eq!(body.root, json!({"name": "ab", "count": 3}));
        assert_eq!(body.field("name"), Some(&json!("ab")));
        assert!(body.files.is_empty());
    }

    #[tokio::test]
    async fn test_json_suffix_content_type() {
        let req = request(Some("application/vnd.api+json"), br#"{"ok": true}"#);
        let body = parse_body(&req, &BodyParseConfig::default()).await.unwrap();
        assert_eq!(body.field("ok"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_missing_content_type_falls_back_to_json() {
        let req = request(None, br#"{"a": 1}"#);
        let body = parse_body(&req, &BodyParseConfig::default()).await.unwrap();
        assert_eq!(body.field("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_invalid_json_rejected() {
        let req = request(Some("application/json"), b"not json");
        let err = parse_body(&req, &BodyParseConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedBody { .. }));
    }

    #[tokio::test]
    async fn test_form_body() {
        let req = request(
            Some("application/x-www-form-urlencoded"),
            b"name=John+Doe&city=New%20York",
        );
        let body = parse_body(&req, &BodyParseConfig::default()).await.unwrap();
        assert_eq!(body.field("name"), Some(&json!("John Doe")));
        assert_eq!(body.field("city"), Some(&json!("New York")));
    }

    #[tokio::test]
    async fn test_multipart_body() {
        let payload = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "hello\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "file data\r\n",
            "--XBOUNDARY--\r\n"
        );
        let req = request(
            Some("multipart/form-data; boundary=XBOUNDARY"),
            payload.as_bytes(),
        );

        let body = parse_body(&req, &BodyParseConfig::default()).await.unwrap();
        assert_eq!(body.field("title"), Some(&json!("hello")));
        assert_eq!(body.files.len(), 1);
        assert_eq!(body.files[0].name, "doc");
        assert_eq!(body.files[0].filename.as_deref(), Some("a.txt"));
        assert_eq!(&body.files[0].data[..], b"file data");
    }

    #[test]
    fn test_empty_body_is_null() {
        let req = request(Some("application/json"), b"");
        let body = tokio_test::block_on(parse_body(&req, &BodyParseConfig::default())).unwrap();
        assert!(body.root.is_null());
    }

    #[tokio::test]
    async fn test_payload_too_large() {
        let req = request(Some("application/json"), &[b'x'; 64]);
        let config = BodyParseConfig {
            max_body_size: 16,
            max_fields: 256,
        };
        let err = parse_body(&req, &config).await.unwrap_err();
        assert!(matches!(
            err,
            Error::PayloadTooLarge {
                limit: 16,
                actual: 64
            }
        ));
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let req = request(Some("application/octet-stream"), b"\x00\x01");
        let err = parse_body(&req, &BodyParseConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedBody { .. }));
    }
}
