//! Documentation tree built from front matter.
//!
//! # Architecture
//!
//! Nodes live in a flat arena (`Vec<DocNode>`) addressed by [`NodeId`], with
//! the tree root at `NodeId(0)`. Parents are plain indices, children are
//! ordered index lists. A `link -> NodeId` map gives O(1) routing lookups.
//!
//! Construction is split in two:
//! - [`DocTreeBuilder`] is pure: it takes directories and file readers and
//!   classifies each file by its front matter.
//! - [`DocRoot::load`] walks a directory and feeds the builder, collecting
//!   per-file failures into a [`BuildReport`] instead of aborting.
//!
//! A directory becomes a titled section when one of its files declares
//! `root: true`; otherwise it is a plain grouping node.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::front_matter::{self, FrontMatter, FrontMatterError, Scan};
use crate::markdown::render_markdown;

/// Index of a node in a [`DocRoot`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The tree root.
    pub const ROOT: Self = Self(0);
}

/// A directory or document in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocNode {
    /// Directory node.
    pub is_dir: bool,
    /// Absolute path of the directory or file.
    pub path: PathBuf,
    /// Path relative to the tree root, `/`-separated. Empty for the root.
    pub rel_path: String,
    /// For directories: relative path of the root document.
    pub file_rel_path: Option<String>,
    /// File holding the rendered body. `None` means no content.
    pub file_path: Option<PathBuf>,
    /// Display name.
    pub name: String,
    /// Sibling sort key.
    pub sort: i64,
    /// Routing key.
    pub link: String,
    /// Publication date.
    pub date: Option<NaiveDateTime>,
    /// Enclosing directory.
    pub parent: Option<NodeId>,
    /// Ordered children.
    pub children: Vec<NodeId>,
}

impl DocNode {
    fn dir(path: PathBuf, rel_path: String, parent: Option<NodeId>) -> Self {
        Self {
            is_dir: true,
            path,
            rel_path,
            file_rel_path: None,
            file_path: None,
            name: String::new(),
            sort: 0,
            link: String::new(),
            date: None,
            parent,
            children: Vec::new(),
        }
    }

    /// Node has a body to render.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.file_path.is_some()
    }
}

/// Error building a documentation tree.
#[derive(Debug, thiserror::Error)]
pub enum DocTreeError {
    /// Front matter opened but never closed.
    #[error("document {path} is missing the closing `---` of its front matter")]
    UnterminatedFrontMatter {
        /// Relative path of the document.
        path: String,
    },
    /// Second `root: true` document in one directory.
    #[error("directory {dir} already has root document {existing}, cannot replace it with {path}")]
    DuplicateRootDocument {
        /// Relative path of the directory.
        dir: String,
        /// Root document already registered.
        existing: String,
        /// Rejected document.
        path: String,
    },
    /// Link already registered by another node.
    #[error("document {path} uses link {link:?} already taken by {existing}")]
    DuplicateLink {
        /// Rejected document.
        path: String,
        /// Conflicting link.
        link: String,
        /// Path of the node that owns the link.
        existing: String,
    },
    /// Unparsable `date` value.
    #[error("document {path} has invalid date {value:?}")]
    InvalidDate {
        /// Relative path of the document.
        path: String,
        /// Raw value.
        value: String,
        /// Parse failure.
        #[source]
        source: chrono::ParseError,
    },
    /// I/O failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl DocTreeError {
    fn from_front_matter(err: FrontMatterError, rel_path: &str, abs_path: &Path) -> Self {
        match err {
            FrontMatterError::Unterminated => Self::UnterminatedFrontMatter {
                path: rel_path.to_owned(),
            },
            FrontMatterError::InvalidDate { value, source } => Self::InvalidDate {
                path: rel_path.to_owned(),
                value,
                source,
            },
            FrontMatterError::Io(source) => Self::Io {
                path: abs_path.to_path_buf(),
                source,
            },
        }
    }
}

/// Errors collected while building a tree.
///
/// A non-empty report marks the build as degraded: the tree is usable but
/// the listed files were skipped.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Per-file failures in discovery order.
    pub errors: Vec<DocTreeError>,
}

impl BuildReport {
    /// Some files failed to load.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Incremental tree construction without file system access.
#[derive(Debug)]
pub struct DocTreeBuilder {
    nodes: Vec<DocNode>,
    /// Child directories of each node, by name.
    dirs: Vec<HashMap<String, NodeId>>,
    links: HashMap<String, NodeId>,
}

impl DocTreeBuilder {
    /// Start a tree rooted at `root_path`.
    #[must_use]
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            nodes: vec![DocNode::dir(root_path.into(), String::new(), None)],
            dirs: vec![HashMap::new()],
            links: HashMap::new(),
        }
    }

    /// Register a directory, creating missing ancestors.
    ///
    /// `rel_path` is `/`-separated and empty for the root itself.
    pub fn add_dir(&mut self, rel_path: &str, abs_path: &Path) -> NodeId {
        let id = self.ensure_dir(rel_path, abs_path);
        abs_path.clone_into(&mut self.nodes[id.0].path);
        id
    }

    fn ensure_dir(&mut self, rel_path: &str, abs_path: &Path) -> NodeId {
        let mut current = NodeId::ROOT;
        if rel_path.is_empty() {
            return current;
        }

        let segments: Vec<&str> = rel_path.split('/').collect();
        // Ancestors of `abs_path` line up with the trailing segments.
        let mut ancestors: Vec<&Path> = abs_path.ancestors().take(segments.len()).collect();
        ancestors.reverse();

        let mut rel = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if !rel.is_empty() {
                rel.push('/');
            }
            rel.push_str(segment);

            if let Some(&child) = self.dirs[current.0].get(*segment) {
                current = child;
                continue;
            }

            let path = ancestors
                .get(i)
                .map_or_else(|| self.nodes[current.0].path.join(segment), |p| p.to_path_buf());
            let child = self.push(DocNode::dir(path, rel.clone(), Some(current)));
            self.dirs[current.0].insert((*segment).to_owned(), child);
            current = child;
        }
        current
    }

    fn push(&mut self, node: DocNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        if let Some(parent) = node.parent {
            self.nodes[parent.0].children.push(id);
        }
        self.nodes.push(node);
        self.dirs.push(HashMap::new());
        id
    }

    /// Classify a file by its front matter and attach it to the tree.
    ///
    /// Returns `Ok(None)` for files without front matter. On error the tree
    /// and link index are left unchanged.
    pub fn add_file<R: BufRead>(
        &mut self,
        rel_path: &str,
        abs_path: &Path,
        reader: R,
    ) -> Result<Option<NodeId>, DocTreeError> {
        let scan = front_matter::scan(reader)
            .map_err(|e| DocTreeError::from_front_matter(e, rel_path, abs_path))?;
        let Scan::Parsed { meta, has_body } = scan else {
            return Ok(None);
        };

        let dir_rel = rel_path.rsplit_once('/').map_or("", |(dir, _)| dir);
        let dir_abs = abs_path.parent().unwrap_or(abs_path);

        if meta.root {
            self.attach_root_document(dir_rel, dir_abs, rel_path, abs_path, meta, has_body)
                .map(Some)
        } else {
            self.attach_document(dir_rel, dir_abs, rel_path, abs_path, meta)
                .map(Some)
        }
    }

    fn attach_root_document(
        &mut self,
        dir_rel: &str,
        dir_abs: &Path,
        rel_path: &str,
        abs_path: &Path,
        meta: FrontMatter,
        has_body: bool,
    ) -> Result<NodeId, DocTreeError> {
        if let Some(dir) = self.find_dir(dir_rel)
            && let Some(existing) = &self.nodes[dir.0].file_rel_path
        {
            return Err(DocTreeError::DuplicateRootDocument {
                dir: dir_rel.to_owned(),
                existing: existing.clone(),
                path: rel_path.to_owned(),
            });
        }

        let link = meta.link.unwrap_or_else(|| {
            if dir_rel.is_empty() {
                String::new()
            } else {
                format!("{dir_rel}/")
            }
        });
        self.check_link(&link, rel_path)?;

        let dir = self.ensure_dir(dir_rel, dir_abs);
        let node = &mut self.nodes[dir.0];
        node.name = meta.name;
        node.date = meta.date;
        node.sort = meta.sort;
        node.link.clone_from(&link);
        node.file_rel_path = Some(rel_path.to_owned());
        if has_body {
            node.file_path = Some(abs_path.to_path_buf());
        }

        self.links.insert(link, dir);
        Ok(dir)
    }

    fn attach_document(
        &mut self,
        dir_rel: &str,
        dir_abs: &Path,
        rel_path: &str,
        abs_path: &Path,
        meta: FrontMatter,
    ) -> Result<NodeId, DocTreeError> {
        let link = meta.link.unwrap_or_else(|| rel_path.to_owned());
        self.check_link(&link, rel_path)?;

        let dir = self.ensure_dir(dir_rel, dir_abs);
        let id = self.push(DocNode {
            is_dir: false,
            path: abs_path.to_path_buf(),
            rel_path: rel_path.to_owned(),
            file_rel_path: None,
            file_path: Some(abs_path.to_path_buf()),
            name: meta.name,
            sort: meta.sort,
            link: link.clone(),
            date: meta.date,
            parent: Some(dir),
            children: Vec::new(),
        });

        self.links.insert(link, id);
        Ok(id)
    }

    fn find_dir(&self, rel_path: &str) -> Option<NodeId> {
        if rel_path.is_empty() {
            return Some(NodeId::ROOT);
        }
        rel_path.split('/').try_fold(NodeId::ROOT, |node, segment| {
            self.dirs[node.0].get(segment).copied()
        })
    }

    fn check_link(&self, link: &str, rel_path: &str) -> Result<(), DocTreeError> {
        match self.links.get(link) {
            Some(&existing) => Err(DocTreeError::DuplicateLink {
                path: rel_path.to_owned(),
                link: link.to_owned(),
                existing: self.nodes[existing.0].path.display().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Sort every sibling list and freeze the tree.
    #[must_use]
    pub fn build(mut self) -> DocRoot {
        self.sort_children(NodeId::ROOT);
        DocRoot {
            nodes: self.nodes,
            links: self.links,
        }
    }

    /// Stable sort by `sort`, children before parents.
    fn sort_children(&mut self, id: NodeId) {
        let mut children = std::mem::take(&mut self.nodes[id.0].children);
        for &child in &children {
            if self.nodes[child.0].is_dir {
                self.sort_children(child);
            }
        }
        children.sort_by_key(|child| self.nodes[child.0].sort);
        self.nodes[id.0].children = children;
    }
}

/// An immutable documentation tree with a link index.
#[derive(Debug)]
pub struct DocRoot {
    nodes: Vec<DocNode>,
    links: HashMap<String, NodeId>,
}

impl DocRoot {
    /// Build a tree from a directory.
    ///
    /// Entries are visited depth-first in file-name order. Zero-byte files
    /// and symlinked directories are skipped. Per-file failures are logged and collected in the
    /// returned [`BuildReport`].
    ///
    /// # Errors
    ///
    /// Returns `DocTreeError::Io` if the root directory cannot be read.
    pub fn load(path: &Path) -> Result<(Self, BuildReport), DocTreeError> {
        let root = std::path::absolute(path).map_err(|source| DocTreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = read_dir_sorted(&root)?;

        let mut builder = DocTreeBuilder::new(&root);
        let mut report = BuildReport::default();
        walk_entries(&mut builder, &mut report, "", entries);

        let tree = builder.build();
        tracing::debug!(
            root = %root.display(),
            nodes = tree.nodes.len(),
            links = tree.links.len(),
            errors = report.errors.len(),
            "Built documentation tree"
        );
        Ok((tree, report))
    }

    /// The tree root.
    #[must_use]
    pub fn root(&self) -> &DocNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&DocNode> {
        self.nodes.get(id.0)
    }

    /// Ordered children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &DocNode)> {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&child| (child, &self.nodes[child.0]))
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Tree holds only the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Exact link lookup.
    #[must_use]
    pub fn node_by_link(&self, link: &str) -> Option<NodeId> {
        self.links.get(link).copied()
    }

    /// Link lookup tolerant of a trailing `/`.
    ///
    /// Tries `link`, then `link/`, then `link` without its trailing `/`.
    #[must_use]
    pub fn resolve(&self, link: &str) -> Option<NodeId> {
        self.node_by_link(link)
            .or_else(|| self.node_by_link(&format!("{link}/")))
            .or_else(|| {
                link.strip_suffix('/')
                    .filter(|trimmed| !trimmed.is_empty())
                    .and_then(|trimmed| self.node_by_link(trimmed))
            })
    }

    /// Rendered HTML body of a node.
    ///
    /// Re-reads the file on every call. Returns an empty string when the node
    /// has no content, the file cannot be read, or no body follows the front
    /// matter.
    #[must_use]
    pub fn content(&self, id: NodeId) -> String {
        let Some(path) = self.node(id).and_then(|node| node.file_path.as_deref()) else {
            return String::new();
        };

        match fs::read_to_string(path) {
            Ok(source) => front_matter::extract_body(&source)
                .map(render_markdown)
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read document");
                String::new()
            }
        }
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<fs::DirEntry>, DocTreeError> {
    let io_err = |source| DocTreeError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(fs::DirEntry::file_name);
    Ok(entries)
}

fn walk_entries(
    builder: &mut DocTreeBuilder,
    report: &mut BuildReport,
    parent_rel: &str,
    entries: Vec<fs::DirEntry>,
) {
    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if parent_rel.is_empty() {
            name
        } else {
            format!("{parent_rel}/{name}")
        };

        if let Err(e) = visit(builder, report, &rel, &path) {
            tracing::warn!(path = %rel, error = %e, "Skipping document");
            report.errors.push(e);
        }
    }
}

fn visit(
    builder: &mut DocTreeBuilder,
    report: &mut BuildReport,
    rel: &str,
    path: &Path,
) -> Result<(), DocTreeError> {
    let io_err = |source| DocTreeError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut metadata = fs::symlink_metadata(path).map_err(io_err)?;
    if metadata.file_type().is_symlink() {
        metadata = fs::metadata(path).map_err(io_err)?;
        if metadata.is_dir() {
            tracing::debug!(path = %rel, "Not following directory symlink");
            return Ok(());
        }
    }

    if metadata.is_dir() {
        let entries = read_dir_sorted(path)?;
        builder.add_dir(rel, path);
        walk_entries(builder, report, rel, entries);
        return Ok(());
    }
    if metadata.len() == 0 {
        return Ok(());
    }

    let file = File::open(path).map_err(io_err)?;
    builder.add_file(rel, path, BufReader::new(file))?;
    Ok(())
}
