use std::path::PathBuf;

/// Error during a sync cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP request to {url} failed: {message}")]
    Http { url: String, message: String },
    /// Non-success response status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    /// Malformed JSON in a listing or manifest.
    #[error("invalid JSON from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    /// File system failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A changed file could not be fetched.
    #[error("failed to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: Box<SyncError>,
    },
    /// Worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
