//! Remote repositories that content is mirrored from.
//!
//! [`RemoteSource`] abstracts the two requests a sync needs: the recursive
//! tree listing and the raw file download. [`GithubSource`] implements them
//! against the GitHub git-trees API and `raw.githubusercontent.com`.

use std::path::{Component, Path};
use std::time::Duration;

use bw_config::{SyncConfig, SyncGroupConfig};
use serde::Deserialize;
use ureq::Agent;

use crate::SyncError;
use crate::manifest::{Manifest, ManifestEntry};

/// One entry of a remote tree listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    #[serde(alias = "Path")]
    pub path: String,
    #[serde(alias = "Sha")]
    pub sha: String,
    /// `blob` for files, `tree` for directories.
    #[serde(rename = "type", alias = "Type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "blob".to_owned()
}

impl RemoteEntry {
    #[must_use]
    pub fn blob(path: &str, sha: &str) -> Self {
        Self {
            path: path.to_owned(),
            sha: sha.to_owned(),
            kind: default_kind(),
        }
    }
}

#[derive(Deserialize)]
struct TreeListing {
    #[serde(alias = "Tree", default)]
    tree: Vec<RemoteEntry>,
}

/// Source of tree listings and file contents.
pub trait RemoteSource: Send + Sync {
    /// List every entry of the group's repository.
    fn fetch_tree(&self, group: &SyncGroupConfig) -> Result<Vec<RemoteEntry>, SyncError>;

    /// Download one file by its repository path (with extension).
    fn fetch_file(&self, group: &SyncGroupConfig, path: &str) -> Result<Vec<u8>, SyncError>;
}

/// Reduce a listing to the Markdown files worth tracking.
///
/// Keeps `.md` blobs except the repository `README.md`, drops the
/// extension, and skips paths that would escape the content directory.
#[must_use]
pub fn markdown_manifest(entries: &[RemoteEntry]) -> Manifest {
    let entries = entries
        .iter()
        .filter(|e| e.kind == "blob" && e.path != "README.md")
        .filter_map(|e| {
            let name = e.path.strip_suffix(".md")?;
            if !is_relative_path(name) {
                tracing::warn!(path = %e.path, "Ignoring remote path outside content directory");
                return None;
            }
            Some(ManifestEntry::new(name, &e.sha))
        })
        .collect();
    Manifest { entries }
}

fn is_relative_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Create HTTP agent with connect and total timeouts.
///
/// Status codes are not turned into errors; callers check them.
pub fn create_agent(dial_timeout: Duration, request_timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_connect(Some(dial_timeout))
        .timeout_global(Some(request_timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// GitHub-backed [`RemoteSource`].
pub struct GithubSource {
    agent: Agent,
    user_agent: String,
    credentials: Option<String>,
}

impl GithubSource {
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            agent: create_agent(config.dial_timeout(), config.request_timeout()),
            user_agent: config.user_agent.clone(),
            credentials: config.credentials_query(),
        }
    }

    fn tree_url(&self, api_url: &str) -> String {
        match &self.credentials {
            Some(query) => {
                let sep = if api_url.contains('?') { '&' } else { '?' };
                format!("{api_url}{sep}{query}")
            }
            None => api_url.to_owned(),
        }
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, SyncError> {
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| SyncError::Http {
                url: url.to_owned(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(SyncError::Status {
                url: url.to_owned(),
                status,
            });
        }

        response
            .into_body()
            .read_to_vec()
            .map_err(|e| SyncError::Http {
                url: url.to_owned(),
                message: e.to_string(),
            })
    }
}

impl RemoteSource for GithubSource {
    fn fetch_tree(&self, group: &SyncGroupConfig) -> Result<Vec<RemoteEntry>, SyncError> {
        let url = self.tree_url(&group.api_url);
        let body = self.get(&url)?;
        let listing: TreeListing = serde_json::from_slice(&body).map_err(|source| SyncError::Json {
            // The query may carry the client secret.
            origin: group.api_url.clone(),
            source,
        })?;
        Ok(listing.tree)
    }

    fn fetch_file(&self, group: &SyncGroupConfig, path: &str) -> Result<Vec<u8>, SyncError> {
        self.get(&format!("{}{path}", group.raw_url))
    }
}
