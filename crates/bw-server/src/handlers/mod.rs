//! HTTP request handlers.

pub(crate) mod blog;
pub(crate) mod docs;
pub(crate) mod pages;
pub(crate) mod products;

use std::path::{Component, Path};

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use md5::{Digest, Md5};
use serde::Serialize;

use crate::error::ServerError;

/// `302 Found` redirect.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))])
            .into_response(),
    }
}

/// Compute `ETag` from version and content.
///
/// MD5 truncated to 64 bits (16 hex chars).
pub(crate) fn compute_etag(version: &str, content: &str) -> String {
    let hash = Md5::digest(format!("{version}:{content}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}

/// JSON response tagged with an `ETag` over `content`.
///
/// Answers `304 Not Modified` when `If-None-Match` carries the same tag.
pub(crate) fn cached_json<T: Serialize>(
    version: &str,
    headers: &HeaderMap,
    content: &str,
    body: &T,
) -> Response {
    let etag = compute_etag(version, content);

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    (
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "private, max-age=60".to_owned()),
        ],
        Json(body),
    )
        .into_response()
}

/// Serve a file below `base`.
///
/// `rel_path` must stay inside `base`.
pub(crate) async fn serve_file(base: &Path, rel_path: &str) -> Result<Response, ServerError> {
    if !is_relative_path(rel_path) {
        return Err(ServerError::FileNotFound(rel_path.to_owned()));
    }

    let path = base.join(rel_path);
    if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
        return Err(ServerError::FileNotFound(rel_path.to_owned()));
    }

    let data = tokio::fs::read(&path).await?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.as_ref().to_owned())], data).into_response())
}

fn is_relative_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_etag_includes_version() {
        assert_ne!(compute_etag("1.0.0", "content"), compute_etag("1.0.1", "content"));
    }

    #[test]
    fn test_compute_etag_includes_content() {
        assert_ne!(compute_etag("1.0.0", "content1"), compute_etag("1.0.0", "content2"));
    }

    #[test]
    fn test_compute_etag_format() {
        let etag = compute_etag("1.0.0", "content");

        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        // 16 hex chars + 2 quotes
        assert_eq!(etag.len(), 18);
    }

    #[test]
    fn test_cached_json_not_modified() {
        let etag = compute_etag("1", "body");
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&etag).unwrap());

        let response = cached_json("1", &headers, "body", &"x");
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let response = cached_json("1", &HeaderMap::new(), "body", &"x");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ETAG], etag.as_str());
    }

    #[test]
    fn test_found() {
        let response = found("/docs/intro/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/docs/intro/");
    }

    #[test]
    fn test_is_relative_path() {
        assert!(is_relative_path("logo.png"));
        assert!(is_relative_path("a/b.png"));
        assert!(!is_relative_path(""));
        assert!(!is_relative_path("../secret"));
        assert!(!is_relative_path("/etc/passwd"));
    }
}
