//! Product showcase endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use bw_site::Project;
use serde::Serialize;

use crate::error::ServerError;
use crate::handlers::serve_file;
use crate::state::AppState;

/// Response for GET /products.
#[derive(Serialize)]
struct ProductsResponse<'a> {
    /// Newest first.
    projects: &'a [Project],
}

/// Handle GET /products.
pub(crate) async fn get_products(State(state): State<Arc<AppState>>) -> Response {
    let projects = state.site.products();
    Json(ProductsResponse {
        projects: &projects,
    })
    .into_response()
}

/// Handle GET /products/images/{*path}.
pub(crate) async fn get_image(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServerError> {
    let base = state.site.config().products_dir.join("images");
    serve_file(&base, &path).await
}
