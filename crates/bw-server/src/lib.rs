//! HTTP server for the Beeweb site.
//!
//! This crate serves the site content over axum:
//! - Marketing pages, blog posts and documentation nodes as JSON
//! - Documentation and product images from disk
//! - Periodic content sync in the background
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use bw_config::Config;
//! use bw_server::{run_server, server_config_from_config, site_config_from_config};
//! use bw_site::Site;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     let site = Arc::new(Site::load(site_config_from_config(&config)));
//!     let server_config = server_config_from_config(&config, "0.9.4".to_owned());
//!
//!     run_server(server_config, site, None).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (bw-server)
//!                        │
//!                        ├─► locale middleware (?lang, cookie, Accept-Language)
//!                        │
//!                        ├─► handlers ──► Site (doc trees + content cache)
//!                        │
//!                        └─► sync task ──► Syncer (rayon) ──► Site::rebuild
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;
mod sync_task;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use bw_config::Config;
use bw_site::{Site, SiteConfig};
use bw_sync::Syncer;
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Locale used when the request names none.
    pub default_locale: String,
    /// Application version (part of every `ETag`).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8090,
            default_locale: "en-US".to_owned(),
            version: String::new(),
        }
    }
}

/// Run the server until Ctrl-C.
///
/// When `syncer` is given, content is synced in the background and the
/// site rebuilt after every cycle that changed a file.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn run_server(
    config: ServerConfig,
    site: Arc<Site>,
    syncer: Option<Syncer>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sync_handle = syncer.map(|syncer| sync_task::spawn(Arc::clone(&site), Arc::new(syncer)));

    let state = Arc::new(AppState {
        site,
        default_locale: config.default_locale.clone(),
        version: config.version.clone(),
    });
    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sync_handle {
        handle.abort();
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from Beeweb config.
#[must_use]
pub fn server_config_from_config(config: &Config, version: String) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        default_locale: config.content_resolved.default_locale.clone(),
        version,
    }
}

/// Create site configuration from Beeweb config.
#[must_use]
pub fn site_config_from_config(config: &Config) -> SiteConfig {
    let content = &config.content_resolved;
    SiteConfig {
        docs_dir: content.docs_dir(),
        blog_dir: content.blog_dir(),
        products_dir: content.products_dir(),
        locales: content.locales.clone(),
        default_doc_link: content.default_doc_link.clone(),
        pages: content.pages.clone(),
        dev_mode: config.is_dev(),
    }
}
