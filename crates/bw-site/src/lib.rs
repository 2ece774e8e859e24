//! Documentation tree, flat content and rendering for Beeweb.
//!
//! This crate provides:
//! - [`DocRoot`]: per-locale documentation tree built from front matter
//! - [`ContentCache`]: rendered doc pages, blog posts and marketing pages
//! - [`Site`]: the context object request handlers share
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use bw_site::{DocLookup, Site, SiteConfig};
//!
//! let config = SiteConfig::with_root(Path::new("."), vec!["en-US".to_owned()]);
//! let site = Site::load(config);
//!
//! if let DocLookup::Found { tree, id, content } = site.doc_page("en-US", "intro") {
//!     let _name = tree.node(id).map(|node| node.name.as_str());
//!     let _html = content;
//! }
//! ```

mod content_cache;
mod doc_tree;
pub mod front_matter;
mod markdown;
mod page_store;
mod products;
mod site;

pub use content_cache::{ContentCache, ContentKey, ContentKind, ContentMap, RenderedDoc};
pub use doc_tree::{BuildReport, DocNode, DocRoot, DocTreeBuilder, DocTreeError, NodeId};
pub use markdown::render_markdown;
pub use page_store::{load_flat_dir, parse_flat, read_flat};
pub use products::{Project, ProductsError, load_projects};
pub use site::{BlogEntry, DocLookup, Site, SiteConfig};
