//! Site context owning every locale's documentation tree and the content
//! cache.
//!
//! # Thread Safety
//!
//! `Site` is shared between request handlers and the sync task:
//! - Doc trees and the product list live in an immutable snapshot behind
//!   `RwLock<Arc<Snapshot>>`; readers clone the `Arc` and drop the lock.
//! - [`Site::rebuild`] builds a complete new snapshot without holding the
//!   lock and swaps it in only when finished. A `Mutex<()>` serializes
//!   concurrent rebuilds.
//! - Rendered documents (doc nodes, blog posts, pages) live in a
//!   [`ContentCache`]. The cache is replaced while the snapshot write lock is
//!   held, and doc lookups read it under the snapshot read lock, so a tree
//!   and its bodies always come from the same rebuild.
//!
//! In development mode every accessor reads and renders from disk instead.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::content_cache::{ContentCache, ContentKey, ContentKind, ContentMap, RenderedDoc};
use crate::doc_tree::{DocRoot, DocTreeBuilder, NodeId};
use crate::page_store;
use crate::products::{self, Project};

/// Configuration for [`Site`].
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Directory containing one documentation tree per locale.
    pub docs_dir: PathBuf,
    /// Directory containing one blog directory per locale.
    pub blog_dir: PathBuf,
    /// Directory holding `projects.json` and `images/`.
    pub products_dir: PathBuf,
    /// Supported locales.
    pub locales: Vec<String>,
    /// Link to redirect to when the docs index has no content.
    pub default_doc_link: String,
    /// Marketing pages read from `docs/<locale>/<name>.md`.
    pub pages: Vec<String>,
    /// Re-read content on every access.
    pub dev_mode: bool,
}

impl SiteConfig {
    /// Layout under a single content root.
    #[must_use]
    pub fn with_root(root: &Path, locales: Vec<String>) -> Self {
        Self {
            docs_dir: root.join("docs"),
            blog_dir: root.join("blog"),
            products_dir: root.join("products"),
            locales,
            default_doc_link: "intro/".to_owned(),
            pages: Vec::new(),
            dev_mode: false,
        }
    }
}

/// Result of a documentation lookup.
#[derive(Debug)]
pub enum DocLookup {
    /// Node found in the tree.
    Found {
        /// Tree the node belongs to.
        tree: Arc<DocRoot>,
        /// Node id within `tree`.
        id: NodeId,
        /// Rendered HTML body; empty when the node has no content.
        content: String,
    },
    /// Send the client to another doc link.
    Redirect(String),
    /// No node for this link.
    NotFound,
}

/// Blog index entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlogEntry {
    pub name: String,
    pub title: String,
}

struct Snapshot {
    docs: HashMap<String, Arc<DocRoot>>,
    products: Arc<Vec<Project>>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            docs: HashMap::new(),
            products: Arc::new(Vec::new()),
        }
    }
}

/// Site content shared by all request handlers.
pub struct Site {
    config: SiteConfig,
    /// Serializes rebuilds.
    rebuild_lock: Mutex<()>,
    /// Current snapshot (atomically swappable).
    current: RwLock<Arc<Snapshot>>,
    cache: ContentCache,
}

impl Site {
    /// Load every locale's content.
    ///
    /// Build errors are logged; a locale whose tree cannot be read at all
    /// gets an empty tree.
    #[must_use]
    pub fn load(config: SiteConfig) -> Self {
        let site = Self {
            config,
            rebuild_lock: Mutex::new(()),
            current: RwLock::new(Arc::new(Snapshot::empty())),
            cache: ContentCache::default(),
        };
        site.rebuild();
        site
    }

    /// Site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Supported locale.
    #[must_use]
    pub fn has_locale(&self, locale: &str) -> bool {
        self.config.locales.iter().any(|l| l == locale)
    }

    /// Rebuild all content and swap it in.
    ///
    /// Returns the number of locales whose documentation build was degraded.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    pub fn rebuild(&self) -> usize {
        let _guard = self.rebuild_lock.lock().unwrap();

        let mut docs = HashMap::new();
        let mut degraded = 0;
        for locale in &self.config.locales {
            let (tree, ok) = self.build_tree(locale);
            if !ok {
                degraded += 1;
            }
            docs.insert(locale.clone(), Arc::new(tree));
        }

        let mut entries = self.build_content_map();
        for (locale, tree) in &docs {
            render_tree(locale, tree, &mut entries);
        }
        let products = Arc::new(self.read_products());

        tracing::info!(
            locales = docs.len(),
            documents = entries.len(),
            products = products.len(),
            degraded,
            "Site content rebuilt"
        );

        let mut current = self.current.write().unwrap();
        self.cache.replace(entries);
        *current = Arc::new(Snapshot { docs, products });
        degraded
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap())
    }

    /// Build one locale's tree. The flag is false when the build was degraded.
    fn build_tree(&self, locale: &str) -> (DocRoot, bool) {
        let path = self.config.docs_dir.join(locale);
        match DocRoot::load(&path) {
            Ok((tree, report)) => {
                if report.is_degraded() {
                    tracing::warn!(
                        locale,
                        errors = report.errors.len(),
                        "Documentation tree built with errors"
                    );
                }
                (tree, !report.is_degraded())
            }
            Err(e) => {
                tracing::warn!(locale, error = %e, "Failed to load documentation tree");
                (DocTreeBuilder::new(path).build(), false)
            }
        }
    }

    fn build_content_map(&self) -> ContentMap {
        let mut entries = ContentMap::new();
        for locale in &self.config.locales {
            for (name, doc) in page_store::load_flat_dir(&self.config.blog_dir.join(locale)) {
                entries.insert(
                    ContentKey::new(ContentKind::Blog, locale, &name),
                    Arc::new(doc),
                );
            }
            for name in &self.config.pages {
                let path = self.config.docs_dir.join(locale).join(name);
                match page_store::read_flat(&path) {
                    Ok(doc) => {
                        entries.insert(ContentKey::new(ContentKind::Page, locale, name), Arc::new(doc));
                    }
                    Err(e) => tracing::debug!(locale, page = %name, error = %e, "Page not loaded"),
                }
            }
        }
        entries
    }

    fn read_products(&self) -> Vec<Project> {
        let path = self.config.products_dir.join("projects.json");
        products::load_projects(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load products");
            Vec::new()
        })
    }

    /// Documentation tree of a locale.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    #[must_use]
    pub fn doc_root(&self, locale: &str) -> Option<Arc<DocRoot>> {
        if !self.has_locale(locale) {
            return None;
        }
        if self.config.dev_mode {
            return Some(Arc::new(self.build_tree(locale).0));
        }
        self.snapshot().docs.get(locale).cloned()
    }

    /// Look up a documentation node by link.
    ///
    /// An empty link addresses the docs index: the tree root when it has
    /// content, otherwise a redirect to the default doc link.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    #[must_use]
    pub fn doc_page(&self, locale: &str, link: &str) -> DocLookup {
        if !self.has_locale(locale) {
            return DocLookup::NotFound;
        }
        if self.config.dev_mode {
            let tree = Arc::new(self.build_tree(locale).0);
            return self.find_doc(tree, link, |tree, id| tree.content(id));
        }

        let current = self.current.read().unwrap();
        let Some(tree) = current.docs.get(locale).cloned() else {
            return DocLookup::NotFound;
        };
        self.find_doc(tree, link, |tree, id| {
            tree.node(id)
                .and_then(|node| self.cache.get(ContentKind::Doc, locale, &node.link))
                .map(|doc| doc.body.clone())
                .unwrap_or_default()
        })
    }

    fn find_doc(
        &self,
        tree: Arc<DocRoot>,
        link: &str,
        content: impl FnOnce(&DocRoot, NodeId) -> String,
    ) -> DocLookup {
        let id = if link.is_empty() {
            if !tree.root().has_content() {
                return DocLookup::Redirect(self.config.default_doc_link.clone());
            }
            NodeId::ROOT
        } else {
            match tree.resolve(link) {
                Some(id) => id,
                None => return DocLookup::NotFound,
            }
        };

        let content = content(&tree, id);
        DocLookup::Found { tree, id, content }
    }

    /// Blog post by name.
    #[must_use]
    pub fn blog(&self, locale: &str, name: &str) -> Option<Arc<RenderedDoc>> {
        self.flat(ContentKind::Blog, locale, name)
    }

    /// Marketing page by name.
    #[must_use]
    pub fn page(&self, locale: &str, name: &str) -> Option<Arc<RenderedDoc>> {
        self.flat(ContentKind::Page, locale, name)
    }

    fn flat(&self, kind: ContentKind, locale: &str, name: &str) -> Option<Arc<RenderedDoc>> {
        if !self.has_locale(locale) || !is_safe_name(name) {
            return None;
        }
        if !self.config.dev_mode {
            return self.cache.get(kind, locale, name);
        }

        let base = match kind {
            ContentKind::Blog => &self.config.blog_dir,
            ContentKind::Page | ContentKind::Doc => &self.config.docs_dir,
        };
        page_store::read_flat(&base.join(locale).join(name))
            .map(Arc::new)
            .ok()
    }

    /// Blog posts of a locale, newest name first.
    #[must_use]
    pub fn blog_index(&self, locale: &str) -> Vec<BlogEntry> {
        if !self.has_locale(locale) {
            return Vec::new();
        }

        if self.config.dev_mode {
            let mut entries: Vec<BlogEntry> =
                page_store::load_flat_dir(&self.config.blog_dir.join(locale))
                    .into_iter()
                    .map(|(name, doc)| BlogEntry {
                        name,
                        title: doc.title,
                    })
                    .collect();
            entries.sort_unstable_by(|a, b| b.name.cmp(&a.name));
            return entries;
        }

        let snapshot = self.cache.snapshot();
        let mut entries: Vec<BlogEntry> = snapshot
            .iter()
            .filter(|(key, _)| key.kind == ContentKind::Blog && key.locale == locale)
            .map(|(key, doc)| BlogEntry {
                name: key.name.clone(),
                title: doc.title.clone(),
            })
            .collect();
        entries.sort_unstable_by(|a, b| b.name.cmp(&a.name));
        entries
    }

    /// Product showcase, newest first.
    #[must_use]
    pub fn products(&self) -> Arc<Vec<Project>> {
        if self.config.dev_mode {
            return Arc::new(self.read_products());
        }
        Arc::clone(&self.snapshot().products)
    }
}

/// Render every node with content into `entries`, keyed by link.
fn render_tree(locale: &str, tree: &DocRoot, entries: &mut ContentMap) {
    for id in (0..tree.len()).map(NodeId) {
        let Some(node) = tree.node(id).filter(|node| node.has_content()) else {
            continue;
        };
        entries.insert(
            ContentKey::new(ContentKind::Doc, locale, &node.link),
            Arc::new(RenderedDoc {
                title: node.name.clone(),
                body: tree.content(id),
            }),
        );
    }
}

/// Relative name with no parent or root components.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    // Ensure Site is Send + Sync for use with Arc
    static_assertions::assert_impl_all!(super::Site: Send, Sync);

    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    fn locales() -> Vec<String> {
        vec!["en-US".to_owned(), "zh-CN".to_owned()]
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "docs/en-US/intro/index.md", "---\nroot: true\nname: Intro\n---\n\nWelcome");
        write(root, "docs/en-US/intro/install.md", "---\nname: Install\nlink: install\nsort: 1\n---\n\nRun `go get`");
        write(root, "docs/en-US/about.md", "# About\n\nBeego is a framework.");
        write(root, "docs/zh-CN/intro/index.md", "---\nroot: true\nname: 简介\n---\n\n欢迎");
        write(root, "blog/en-US/2013-10-01-hello.md", "# Hello\n\nFirst post");
        write(root, "blog/en-US/2014-01-01-news.md", "# News\n\nSecond post");
        write(root, "products/projects.json", r#"{"Projects":[{"Name":"A"},{"Name":"B"}]}"#);
        dir
    }

    fn create_site(root: &Path, dev_mode: bool) -> Site {
        let mut config = SiteConfig::with_root(root, locales());
        config.pages = vec!["about".to_owned()];
        config.dev_mode = dev_mode;
        Site::load(config)
    }

    #[test]
    fn test_load_builds_every_locale() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        assert!(site.doc_root("en-US").is_some());
        assert!(site.doc_root("zh-CN").is_some());
        assert!(site.doc_root("fr-FR").is_none());
    }

    #[test]
    fn test_doc_page_found() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        let DocLookup::Found { tree, id, content } = site.doc_page("en-US", "intro") else {
            panic!("expected intro");
        };
        assert_eq!(tree.node(id).unwrap().name, "Intro");
        assert!(content.contains("Welcome"));

        assert!(matches!(site.doc_page("en-US", "install"), DocLookup::Found { .. }));
        assert!(matches!(site.doc_page("en-US", "missing"), DocLookup::NotFound));
        assert!(matches!(site.doc_page("fr-FR", "intro"), DocLookup::NotFound));
    }

    #[test]
    fn test_doc_page_empty_link_redirects() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        match site.doc_page("en-US", "") {
            DocLookup::Redirect(link) => assert_eq!(link, "intro/"),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn test_doc_page_empty_link_uses_root_document() {
        let dir = fixture();
        write(dir.path(), "docs/en-US/index.md", "---\nroot: true\nname: Docs\n---\n\nIndex");
        let site = create_site(dir.path(), false);

        let DocLookup::Found { id, .. } = site.doc_page("en-US", "") else {
            panic!("expected root document");
        };
        assert_eq!(id, NodeId::ROOT);
    }

    #[test]
    fn test_missing_locale_dir_gives_empty_tree() {
        let dir = fixture();
        fs::remove_dir_all(dir.path().join("docs/zh-CN")).unwrap();
        let mut config = SiteConfig::with_root(dir.path(), locales());
        config.pages = vec!["about".to_owned()];
        let site = Site::load(config);

        assert!(site.doc_root("zh-CN").unwrap().is_empty());
        assert_eq!(site.rebuild(), 1);
    }

    #[test]
    fn test_blog_and_pages_from_cache() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        assert_eq!(site.blog("en-US", "2013-10-01-hello").unwrap().title, "Hello");
        assert!(site.blog("zh-CN", "2013-10-01-hello").is_none());
        assert_eq!(site.page("en-US", "about").unwrap().title, "About");
        assert!(site.page("zh-CN", "about").is_none());
        assert!(site.page("en-US", "../about").is_none());
    }

    #[test]
    fn test_blog_index_newest_first() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        let names: Vec<_> = site.blog_index("en-US").into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["2014-01-01-news", "2013-10-01-hello"]);
        assert!(site.blog_index("zh-CN").is_empty());
    }

    #[test]
    fn test_products_newest_first() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        let names: Vec<_> = site.products().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_prod_mode_serves_snapshot_until_rebuild() {
        let dir = fixture();
        let site = create_site(dir.path(), false);
        write(dir.path(), "blog/en-US/2015-05-05-later.md", "# Later\n\nThird");
        write(dir.path(), "docs/en-US/new.md", "---\nname: New\nlink: new\n---\nNew");

        assert!(site.blog("en-US", "2015-05-05-later").is_none());
        assert!(matches!(site.doc_page("en-US", "new"), DocLookup::NotFound));

        assert_eq!(site.rebuild(), 0);

        assert_eq!(site.blog("en-US", "2015-05-05-later").unwrap().title, "Later");
        assert!(matches!(site.doc_page("en-US", "new"), DocLookup::Found { .. }));
    }

    #[test]
    fn test_prod_mode_doc_body_fixed_until_rebuild() {
        let dir = fixture();
        let site = create_site(dir.path(), false);
        let body = |site: &Site| match site.doc_page("en-US", "install") {
            DocLookup::Found { content, .. } => content,
            other => panic!("expected install, got {other:?}"),
        };
        assert!(body(&site).contains("go get"));

        let path = dir.path().join("docs/en-US/intro/install.md");
        write(dir.path(), "docs/en-US/intro/install.md", "---\nname: Install\nlink: install\nsort: 1\n---\n\nUpdated");
        assert!(body(&site).contains("go get"));

        fs::remove_file(path).unwrap();
        assert!(body(&site).contains("go get"));

        site.rebuild();
        assert!(matches!(site.doc_page("en-US", "install"), DocLookup::NotFound));
    }

    #[test]
    fn test_rebuild_caches_rendered_docs() {
        let dir = fixture();
        let site = create_site(dir.path(), false);

        let intro = site.cache.get(ContentKind::Doc, "en-US", "intro/").unwrap();
        assert_eq!(intro.title, "Intro");
        assert_eq!(intro.body, "<p>Welcome</p>\n");
        assert!(site.cache.get(ContentKind::Doc, "en-US", "install").is_some());
        assert!(site.cache.get(ContentKind::Doc, "zh-CN", "install").is_none());
    }

    #[test]
    fn test_dev_mode_reads_from_disk() {
        let dir = fixture();
        let site = create_site(dir.path(), true);
        write(dir.path(), "blog/en-US/2015-05-05-later.md", "# Later\n\nThird");
        write(dir.path(), "docs/en-US/new.md", "---\nname: New\nlink: new\n---\nNew");

        assert_eq!(site.blog("en-US", "2015-05-05-later").unwrap().title, "Later");
        assert_eq!(site.blog_index("en-US").len(), 3);
        assert!(matches!(site.doc_page("en-US", "new"), DocLookup::Found { .. }));

        write(dir.path(), "docs/en-US/new.md", "---\nname: New\nlink: new\n---\nEdited");
        let DocLookup::Found { content, .. } = site.doc_page("en-US", "new") else {
            panic!("expected new");
        };
        assert!(content.contains("Edited"));
    }

    #[test]
    fn test_is_safe_name() {
        assert!(is_safe_name("2014/post"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name("../secret"));
        assert!(!is_safe_name("/etc/passwd"));
        assert!(!is_safe_name("a/../../b"));
    }
}
