//! In-memory cache of rendered documents.
//!
//! Entries are keyed by `(kind, locale, name)`; documentation pages use
//! their tree link as the name. The whole map is replaced at
//! once: readers clone the current `Arc` under a shared lock, a rebuild swaps
//! in a fully built map under the exclusive lock. A reader therefore sees
//! either the previous mapping or the new one, never a mix.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;

/// Document group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Documentation tree node, keyed by link.
    Doc,
    /// Blog post under `blog/<locale>/`.
    Blog,
    /// Marketing page under `docs/<locale>/`.
    Page,
}

/// Cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub kind: ContentKind,
    pub locale: String,
    pub name: String,
}

impl ContentKey {
    #[must_use]
    pub fn new(kind: ContentKind, locale: &str, name: &str) -> Self {
        Self {
            kind,
            locale: locale.to_owned(),
            name: name.to_owned(),
        }
    }
}

/// Rendered title and HTML body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderedDoc {
    /// Plain-text title.
    pub title: String,
    /// Rendered HTML.
    #[serde(rename = "content")]
    pub body: String,
}

/// Mapping held by a [`ContentCache`].
pub type ContentMap = HashMap<ContentKey, Arc<RenderedDoc>>;

/// Shared, wholesale-replaced cache of rendered documents.
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: RwLock<Arc<ContentMap>>,
}

impl ContentCache {
    /// Create a cache holding `entries`.
    #[must_use]
    pub fn new(entries: ContentMap) -> Self {
        Self {
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// Look up one entry.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn get(&self, kind: ContentKind, locale: &str, name: &str) -> Option<Arc<RenderedDoc>> {
        self.snapshot().get(&ContentKey::new(kind, locale, name)).cloned()
    }

    /// Current mapping, for consistent multi-key reads.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ContentMap> {
        Arc::clone(&self.entries.read().unwrap())
    }

    /// Swap in a new mapping.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    pub fn replace(&self, entries: ContentMap) {
        let entries = Arc::new(entries);
        *self.entries.write().unwrap() = entries;
    }

    /// Names of one kind in one locale, sorted descending.
    #[must_use]
    pub fn names(&self, kind: ContentKind, locale: &str) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut names: Vec<String> = snapshot
            .keys()
            .filter(|key| key.kind == kind && key.locale == locale)
            .map(|key| key.name.clone())
            .collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        names
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
