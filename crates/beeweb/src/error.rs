//! CLI error types.

use bw_config::ConfigError;
use bw_sync::SyncError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Validation(String),
}
