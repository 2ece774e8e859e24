//! Documentation endpoint.
//!
//! `/docs/{link}` serves the node registered under `link` in the locale's
//! tree. Links below `images/` are files from `docs/<locale>/images/`.

use std::sync::Arc;

use axum::Extension;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use bw_site::{DocLookup, DocNode, DocRoot, NodeId};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::ServerError;
use crate::handlers::{cached_json, found, serve_file};
use crate::middleware::locale::Locale;
use crate::state::AppState;

/// Link prefix of documentation images.
const IMAGES_PREFIX: &str = "images/";

/// Response for GET /docs/{link}.
#[derive(Debug, Serialize)]
struct DocResponse {
    title: String,
    link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDateTime>,
    /// Rendered HTML body.
    content: String,
    children: Vec<ChildResponse>,
}

/// Child entry for in-page navigation.
#[derive(Debug, Serialize)]
struct ChildResponse {
    title: String,
    link: String,
    is_dir: bool,
}

impl From<&DocNode> for ChildResponse {
    fn from(node: &DocNode) -> Self {
        Self {
            title: node.name.clone(),
            link: to_docs_url(&node.link),
            is_dir: node.is_dir,
        }
    }
}

fn to_docs_url(link: &str) -> String {
    format!("/docs/{link}")
}

/// Handle GET /docs and /docs/.
pub(crate) async fn get_docs_index(
    State(state): State<Arc<AppState>>,
    Extension(Locale(locale)): Extension<Locale>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    render_doc(&state, &locale, "", &headers)
}

/// Handle GET /docs/{*link}.
pub(crate) async fn get_doc(
    Path(link): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(Locale(locale)): Extension<Locale>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    if let Some(image) = link.strip_prefix(IMAGES_PREFIX) {
        let base = state.site.config().docs_dir.join(&locale).join("images");
        return serve_file(&base, image).await;
    }
    render_doc(&state, &locale, &link, &headers)
}

fn render_doc(
    state: &AppState,
    locale: &str,
    link: &str,
    headers: &HeaderMap,
) -> Result<Response, ServerError> {
    let default_link = &state.site.config().default_doc_link;

    match state.site.doc_page(locale, link) {
        DocLookup::Found { tree, id, content } => {
            Ok(doc_response(state, &tree, id, content, headers))
        }
        DocLookup::Redirect(target) => Ok(found(&to_docs_url(&target))),
        DocLookup::NotFound if !is_same_link(link, default_link) => {
            tracing::debug!(locale, link, "Unknown doc link, redirecting to default");
            Ok(found(&to_docs_url(default_link)))
        }
        DocLookup::NotFound => Err(ServerError::PageNotFound(link.to_owned())),
    }
}

fn doc_response(
    state: &AppState,
    tree: &DocRoot,
    id: NodeId,
    content: String,
    headers: &HeaderMap,
) -> Response {
    let Some(node) = tree.node(id) else {
        return ServerError::PageNotFound(String::new()).into_response();
    };

    let response = DocResponse {
        title: node.name.clone(),
        link: to_docs_url(&node.link),
        date: node.date,
        content,
        children: tree.children(id).map(|(_, child)| child.into()).collect(),
    };
    cached_json(&state.version, headers, &response.content, &response)
}

/// Links equal up to a trailing `/`.
fn is_same_link(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_same_link() {
        assert!(is_same_link("intro", "intro/"));
        assert!(is_same_link("intro/", "intro/"));
        assert!(!is_same_link("install", "intro/"));
    }

    #[test]
    fn test_doc_response_serialization() {
        let response = DocResponse {
            title: "Intro".to_owned(),
            link: "/docs/intro/".to_owned(),
            date: None,
            content: "<p>Hi</p>".to_owned(),
            children: vec![ChildResponse {
                title: "Install".to_owned(),
                link: "/docs/install".to_owned(),
                is_dir: false,
            }],
        };

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["title"], "Intro");
        assert_eq!(json["children"][0]["link"], "/docs/install");
        assert!(json.get("date").is_none());
    }
}
