//! Last-check stamp and due-check logic.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SyncError;

/// Persisted sync bookkeeping (`sync-state.json`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// When the last check ran.
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Load the state. A missing or unreadable file yields an empty state,
    /// which makes the next check due.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match fs::read(path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt sync state");
                Self::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read sync state");
                Self::default()
            }
        }
    }

    /// Persist the state.
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        let data = serde_json::to_vec_pretty(self).map_err(|source| SyncError::Json {
            origin: path.display().to_string(),
            source,
        })?;
        fs::write(path, data).map_err(|e| SyncError::io(path, e))
    }

    /// A check is due when none was recorded, a manifest is missing, or
    /// the last one is older than `interval`.
    #[must_use]
    pub fn needs_check(&self, manifests_present: bool, interval: Duration, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_check else {
            return true;
        };
        if !manifests_present {
            return true;
        }
        let interval = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX);
        last.checked_add_signed(interval).is_none_or(|due| due < now)
    }
}
