//! Marketing pages.
//!
//! `/` serves the `home` page and `/community` the `usecases` page;
//! `/quickstart`, `/team`, `/about` and `/donate` serve the page named by
//! the path. Responses are `{title, content}` JSON.

use std::sync::Arc;

use axum::Extension;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;

use crate::error::ServerError;
use crate::handlers::cached_json;
use crate::middleware::locale::Locale;
use crate::state::AppState;

/// Page served at `/`.
const HOME_PAGE: &str = "home";

/// Routes served at `/{route}` with the page each one renders.
pub(crate) const NAMED_PAGES: &[(&str, &str)] = &[
    ("community", "usecases"),
    ("quickstart", "quickstart"),
    ("team", "team"),
    ("about", "about"),
    ("donate", "donate"),
];

/// Handle GET /.
pub(crate) async fn get_home(
    State(state): State<Arc<AppState>>,
    Extension(Locale(locale)): Extension<Locale>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    render_page(&state, &locale, HOME_PAGE, &headers)
}

/// Handle GET /{name} for every entry of [`NAMED_PAGES`].
pub(crate) async fn get_page(
    State(state): State<Arc<AppState>>,
    Extension(Locale(locale)): Extension<Locale>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let route = uri.path().trim_matches('/');
    let name = page_for_route(route).unwrap_or(route);
    render_page(&state, &locale, name, &headers)
}

fn page_for_route(route: &str) -> Option<&'static str> {
    NAMED_PAGES
        .iter()
        .find(|(r, _)| *r == route)
        .map(|(_, page)| *page)
}

fn render_page(
    state: &AppState,
    locale: &str,
    name: &str,
    headers: &HeaderMap,
) -> Result<Response, ServerError> {
    let doc = state
        .site
        .page(locale, name)
        .ok_or_else(|| ServerError::PageNotFound(name.to_owned()))?;

    Ok(cached_json(&state.version, headers, &doc.body, doc.as_ref()))
}
