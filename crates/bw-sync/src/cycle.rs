//! One sync pass over the configured content groups.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bw_config::{Config, SyncGroupConfig};
use chrono::Utc;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::SyncError;
use crate::manifest::{Manifest, ManifestEntry};
use crate::remote::{GithubSource, RemoteSource, markdown_manifest};
use crate::schedule::SyncState;

const STATE_FILE: &str = "sync-state.json";

/// Outcome of syncing one group.
#[derive(Debug)]
pub struct GroupReport {
    pub name: String,
    /// Markdown files in the remote listing.
    pub tracked: usize,
    /// Paths fetched and written, without extension.
    pub updated: Vec<String>,
}

/// Outcome of a full cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub groups: Vec<GroupReport>,
    /// Groups that failed; their files and manifests were left untouched.
    pub failures: Vec<(String, SyncError)>,
}

impl CycleReport {
    /// Any file was written.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.groups.iter().any(|g| !g.updated.is_empty())
    }

    /// Every group succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sync one group.
///
/// Fetches the listing, downloads every new or changed file on `pool`, and
/// only when all downloads succeed writes the files under
/// `{content_root}/{prefix}/` and persists the new manifest. A failure
/// leaves the disk untouched.
pub fn sync_group(
    source: &dyn RemoteSource,
    pool: &ThreadPool,
    group: &SyncGroupConfig,
    content_root: &Path,
    manifest_path: &Path,
) -> Result<GroupReport, SyncError> {
    let previous = Manifest::load(manifest_path)?;
    let current = markdown_manifest(&source.fetch_tree(group)?);
    let changed = previous.changed_entries(&current);

    tracing::debug!(
        group = %group.name,
        tracked = current.len(),
        changed = changed.len(),
        "Compared remote listing"
    );

    let fetched: Vec<(&ManifestEntry, Vec<u8>)> = pool.install(|| {
        changed
            .par_iter()
            .map(|entry| {
                let remote_path = format!("{}.md", entry.path);
                source
                    .fetch_file(group, &remote_path)
                    .map(|data| (*entry, data))
                    .map_err(|e| SyncError::Fetch {
                        path: remote_path,
                        source: Box::new(e),
                    })
            })
            .collect::<Result<_, _>>()
    })?;

    let target = content_root.join(&group.prefix);
    let files: Vec<(PathBuf, &[u8])> = fetched
        .iter()
        .map(|(entry, data)| (target.join(format!("{}.md", entry.path)), data.as_slice()))
        .collect();
    let staged = stage_files(&files)?;
    for ((path, tmp), (entry, _)) in staged.iter().zip(&fetched) {
        fs::rename(tmp, path).map_err(|e| SyncError::io(path, e))?;
        tracing::info!(group = %group.name, path = %entry.path, "Updated content file");
    }

    current.save(manifest_path)?;

    Ok(GroupReport {
        name: group.name.clone(),
        tracked: current.len(),
        updated: fetched.iter().map(|(e, _)| e.path.clone()).collect(),
    })
}

/// Write every file to a sibling temp path.
///
/// Returns `(target, temp)` pairs ready to be renamed. On failure every temp
/// file written so far is removed and no target is touched.
fn stage_files(files: &[(PathBuf, &[u8])]) -> Result<Vec<(PathBuf, PathBuf)>, SyncError> {
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for (path, data) in files {
        match stage_file(path, data) {
            Ok(tmp) => staged.push((path.clone(), tmp)),
            Err(e) => {
                for (_, tmp) in &staged {
                    if let Err(e) = fs::remove_file(tmp) {
                        tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove staged file");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(staged)
}

fn stage_file(path: &Path, data: &[u8]) -> Result<PathBuf, SyncError> {
    if path.is_dir() {
        return Err(SyncError::io(
            path,
            io::Error::new(io::ErrorKind::IsADirectory, "target is a directory"),
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    let tmp = path.with_extension("md.sync-tmp");
    fs::write(&tmp, data).map_err(|e| SyncError::io(&tmp, e))?;
    Ok(tmp)
}

/// Syncs every configured group and records when it last ran.
pub struct Syncer {
    source: Arc<dyn RemoteSource>,
    groups: Vec<SyncGroupConfig>,
    content_root: PathBuf,
    project_dir: PathBuf,
    interval: Duration,
    pool: ThreadPool,
}

impl Syncer {
    /// Create a syncer with an explicit source.
    pub fn new(
        source: Arc<dyn RemoteSource>,
        groups: Vec<SyncGroupConfig>,
        content_root: PathBuf,
        project_dir: PathBuf,
        interval: Duration,
        workers: usize,
    ) -> Result<Self, SyncError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("bw-sync-{i}"))
            .build()?;
        Ok(Self {
            source,
            groups,
            content_root,
            project_dir,
            interval,
            pool,
        })
    }

    /// Create a GitHub-backed syncer from configuration.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let content = &config.content_resolved;
        Self::new(
            Arc::new(GithubSource::new(&config.sync)),
            config.sync.groups.clone(),
            content.root_dir.clone(),
            content.project_dir.clone(),
            config.sync.interval(),
            config.sync.workers,
        )
    }

    fn manifest_path(&self, group: &SyncGroupConfig) -> PathBuf {
        self.project_dir.join(group.manifest_file())
    }

    fn state_path(&self) -> PathBuf {
        self.project_dir.join(STATE_FILE)
    }

    /// Configured sync interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A check is due (see [`SyncState::needs_check`]).
    #[must_use]
    pub fn is_due(&self) -> bool {
        let manifests_present = self.groups.iter().all(|g| self.manifest_path(g).is_file());
        SyncState::load(&self.state_path()).needs_check(manifests_present, self.interval, Utc::now())
    }

    /// Sync every group. A failing group does not stop the others.
    pub fn run_cycle(&self) -> CycleReport {
        tracing::info!(groups = self.groups.len(), "Checking content updates");
        let mut report = CycleReport::default();

        for group in &self.groups {
            let manifest_path = self.manifest_path(group);
            match sync_group(
                self.source.as_ref(),
                &self.pool,
                group,
                &self.content_root,
                &manifest_path,
            ) {
                Ok(group_report) => report.groups.push(group_report),
                Err(e) => {
                    tracing::error!(group = %group.name, error = %e, "Content sync failed");
                    report.failures.push((group.name.clone(), e));
                }
            }
        }

        let state = SyncState {
            last_check: Some(Utc::now()),
        };
        if let Err(e) = state.save(&self.state_path()) {
            tracing::warn!(error = %e, "Failed to record sync time");
        }

        tracing::info!(
            changed = report.changed(),
            failures = report.failures.len(),
            "Finished content update check"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::RemoteEntry;

    #[derive(Default)]
    struct MockSource {
        tree: Vec<RemoteEntry>,
        files: HashMap<String, Vec<u8>>,
        failing: HashSet<String>,
        fetched: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn with_file(mut self, path: &str, sha: &str, body: &str) -> Self {
            self.tree.push(RemoteEntry::blob(path, sha));
            self.files.insert(path.to_owned(), body.as_bytes().to_vec());
            self
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing.insert(path.to_owned());
            self
        }

        fn fetched(&self) -> Vec<String> {
            let mut fetched = self.fetched.lock().unwrap().clone();
            fetched.sort();
            fetched
        }
    }

    impl RemoteSource for MockSource {
        fn fetch_tree(&self, _group: &SyncGroupConfig) -> Result<Vec<RemoteEntry>, SyncError> {
            Ok(self.tree.clone())
        }

        fn fetch_file(&self, _group: &SyncGroupConfig, path: &str) -> Result<Vec<u8>, SyncError> {
            self.fetched.lock().unwrap().push(path.to_owned());
            if self.failing.contains(path) {
                return Err(SyncError::Status {
                    url: path.to_owned(),
                    status: 500,
                });
            }
            Ok(self.files[path].clone())
        }
    }

    fn group() -> SyncGroupConfig {
        SyncGroupConfig {
            name: "docs".to_owned(),
            api_url: "https://api.example.com/tree".to_owned(),
            raw_url: "https://raw.example.com/".to_owned(),
            prefix: "docs".to_owned(),
        }
    }

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn test_only_changed_files_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join(".beeweb/docTree.json");
        Manifest {
            entries: vec![
                ManifestEntry::new("en-US/a", "old"),
                ManifestEntry::new("en-US/b", "same"),
            ],
        }
        .save(&manifest_path)
        .unwrap();
        fs::create_dir_all(dir.path().join("docs/en-US")).unwrap();
        fs::write(dir.path().join("docs/en-US/b.md"), "local b").unwrap();

        let source = MockSource::default()
            .with_file("en-US/a.md", "new", "remote a")
            .with_file("en-US/b.md", "same", "remote b");

        let report = sync_group(&source, &pool(), &group(), dir.path(), &manifest_path).unwrap();

        assert_eq!(source.fetched(), vec!["en-US/a.md"]);
        assert_eq!(report.updated, vec!["en-US/a"]);
        assert_eq!(report.tracked, 2);
        assert_eq!(fs::read_to_string(dir.path().join("docs/en-US/a.md")).unwrap(), "remote a");
        assert_eq!(fs::read_to_string(dir.path().join("docs/en-US/b.md")).unwrap(), "local b");

        let saved = Manifest::load(&manifest_path).unwrap();
        assert_eq!(
            saved.entries,
            vec![ManifestEntry::new("en-US/a", "new"), ManifestEntry::new("en-US/b", "same")]
        );
    }

    #[test]
    fn test_failed_fetch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join(".beeweb/docTree.json");

        let source = MockSource::default()
            .with_file("en-US/a.md", "1", "a")
            .with_file("en-US/b.md", "2", "b")
            .failing("en-US/b.md");

        let err = sync_group(&source, &pool(), &group(), dir.path(), &manifest_path).unwrap_err();

        assert!(matches!(err, SyncError::Fetch { ref path, .. } if path == "en-US/b.md"));
        assert!(!dir.path().join("docs/en-US/a.md").exists());
        assert!(!manifest_path.exists());
    }

    #[test]
    fn test_failed_write_replaces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join(".beeweb/docTree.json");
        fs::create_dir_all(dir.path().join("docs/en-US/b.md")).unwrap();
        fs::write(dir.path().join("docs/en-US/a.md"), "local a").unwrap();

        let source = MockSource::default()
            .with_file("en-US/a.md", "1", "remote a")
            .with_file("en-US/b.md", "2", "remote b");

        let err = sync_group(&source, &pool(), &group(), dir.path(), &manifest_path).unwrap_err();

        assert!(matches!(err, SyncError::Io { ref path, .. } if path.ends_with("b.md")));
        assert_eq!(fs::read_to_string(dir.path().join("docs/en-US/a.md")).unwrap(), "local a");
        assert!(!dir.path().join("docs/en-US/a.md.sync-tmp").exists());
        assert!(!manifest_path.exists());
    }

    #[test]
    fn test_unchanged_listing_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("docTree.json");
        let source = MockSource::default().with_file("en-US/a.md", "1", "a");

        sync_group(&source, &pool(), &group(), dir.path(), &manifest_path).unwrap();
        let report = sync_group(&source, &pool(), &group(), dir.path(), &manifest_path).unwrap();

        assert!(report.updated.is_empty());
        assert_eq!(source.fetched(), vec!["en-US/a.md"]);
    }

    #[test]
    fn test_syncer_cycle_records_state() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join(".beeweb");
        let source = Arc::new(MockSource::default().with_file("en-US/intro.md", "1", "hello"));
        let mut blog = group();
        blog.name = "blog".to_owned();
        blog.prefix = "blog".to_owned();

        let syncer = Syncer::new(
            source,
            vec![group(), blog],
            dir.path().to_path_buf(),
            project_dir.clone(),
            Duration::from_secs(300),
            2,
        )
        .unwrap();

        assert!(syncer.is_due());
        let report = syncer.run_cycle();

        assert!(report.is_success());
        assert!(report.changed());
        assert!(dir.path().join("docs/en-US/intro.md").is_file());
        assert!(dir.path().join("blog/en-US/intro.md").is_file());
        assert!(project_dir.join("docTree.json").is_file());
        assert!(project_dir.join("blogTree.json").is_file());
        assert!(!syncer.is_due());
    }
}
