//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use bw_site::Site;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Site content (doc trees, content cache, products).
    pub(crate) site: Arc<Site>,
    /// Locale used when the request names none.
    pub(crate) default_locale: String,
    /// Application version for `ETag` computation.
    pub(crate) version: String,
}
