//! Last-known `{path, sha}` listing of a content group.
//!
//! Persisted as `{"Tree":[{"Sha":"..","Path":".."}]}`. Paths carry no
//! `.md` extension.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// One tracked file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Sha", alias = "sha")]
    pub sha: String,
    #[serde(rename = "Path", alias = "path")]
    pub path: String,
}

impl ManifestEntry {
    #[must_use]
    pub fn new(path: &str, sha: &str) -> Self {
        Self {
            sha: sha.to_owned(),
            path: path.to_owned(),
        }
    }
}

/// Ordered list of tracked files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "Tree", alias = "tree", default)]
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load a manifest. A missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SyncError::io(path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| SyncError::Json {
            origin: path.display().to_string(),
            source,
        })
    }

    /// Persist atomically: write a sibling temp file, then rename over `path`.
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }

        let data = serde_json::to_vec(self).map_err(|source| SyncError::Json {
            origin: path.display().to_string(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| SyncError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| SyncError::io(path, e))
    }

    /// Entries of `current` that are new or whose sha differs from `self`.
    #[must_use]
    pub fn changed_entries<'a>(&self, current: &'a Manifest) -> Vec<&'a ManifestEntry> {
        let known: HashMap<&str, &str> = self
            .entries
            .iter()
            .map(|e| (e.path.as_str(), e.sha.as_str()))
            .collect();

        current
            .entries
            .iter()
            .filter(|e| known.get(e.path.as_str()) != Some(&e.sha.as_str()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn manifest(entries: &[(&str, &str)]) -> Manifest {
        Manifest {
            entries: entries.iter().map(|(p, s)| ManifestEntry::new(p, s)).collect(),
        }
    }

    #[test]
    fn test_changed_entries() {
        let previous = manifest(&[("en-US/a", "1"), ("en-US/b", "2"), ("en-US/gone", "3")]);
        let current = manifest(&[("en-US/a", "9"), ("en-US/b", "2"), ("en-US/new", "4")]);

        let changed: Vec<_> = previous
            .changed_entries(&current)
            .into_iter()
            .map(|e| e.path.as_str())
            .collect();

        assert_eq!(changed, vec!["en-US/a", "en-US/new"]);
    }

    #[test]
    fn test_changed_entries_from_empty() {
        let current = manifest(&[("a", "1")]);
        assert_eq!(Manifest::default().changed_entries(&current).len(), 1);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_string(&manifest(&[("en-US/intro", "abc")])).unwrap();
        assert_eq!(json, r#"{"Tree":[{"Sha":"abc","Path":"en-US/intro"}]}"#);

        let parsed: Manifest = serde_json::from_str(r#"{"tree":[{"path":"x","sha":"y"}]}"#).unwrap();
        assert_eq!(parsed, manifest(&[("x", "y")]));
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Manifest::load(&dir.path().join("docTree.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docTree.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Manifest::load(&path), Err(SyncError::Json { .. })));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/docTree.json");
        let original = manifest(&[("en-US/a", "1"), ("zh-CN/a", "2")]);

        original.save(&path).unwrap();

        assert_eq!(Manifest::load(&path).unwrap(), original);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
