//! Blog endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bw_site::BlogEntry;
use serde::Serialize;

use crate::handlers::{cached_json, found};
use crate::middleware::locale::Locale;
use crate::state::AppState;

/// Where unknown posts are sent.
const BLOG_INDEX: &str = "/blog";

/// Response for GET /blog.
#[derive(Serialize)]
struct BlogIndexResponse {
    /// Newest first.
    posts: Vec<BlogEntry>,
}

/// Handle GET /blog.
pub(crate) async fn get_index(
    State(state): State<Arc<AppState>>,
    Extension(Locale(locale)): Extension<Locale>,
) -> impl IntoResponse {
    Json(BlogIndexResponse {
        posts: state.site.blog_index(&locale),
    })
}

/// Handle GET /blog/{*name}.
///
/// Unknown posts redirect to the blog index.
pub(crate) async fn get_post(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(Locale(locale)): Extension<Locale>,
    headers: HeaderMap,
) -> Response {
    let name = name.trim_end_matches('/');
    match state.site.blog(&locale, name) {
        Some(doc) => cached_json(&state.version, &headers, &doc.body, doc.as_ref()),
        None => found(BLOG_INDEX),
    }
}
