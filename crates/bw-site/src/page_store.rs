//! Flat Markdown documents: blog posts and marketing pages.
//!
//! A flat document has no front matter. The title is its first heading line
//! without the leading `#` markers; the body is everything after the first
//! blank line.

use std::fs;
use std::io;
use std::path::Path;

use crate::content_cache::RenderedDoc;
use crate::markdown::render_markdown;

/// Split a flat document into title and rendered body.
///
/// Without a blank line the body starts after the heading line, or at the
/// top when there is no heading.
#[must_use]
pub fn parse_flat(source: &str) -> RenderedDoc {
    let mut title = None;
    let mut after_heading = None;
    let mut body = None;

    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            body = Some(&source[offset..]);
            break;
        }
        if title.is_none() && trimmed.starts_with('#') {
            title = Some(trimmed.trim_start_matches('#').trim());
            after_heading = Some(&source[offset..]);
        }
    }

    let body = body.or(after_heading).unwrap_or(source);
    RenderedDoc {
        title: title.unwrap_or_default().to_owned(),
        body: render_markdown(body.trim()),
    }
}

/// Read and render `{path}.md`.
pub fn read_flat(path_without_ext: &Path) -> io::Result<RenderedDoc> {
    let mut path = path_without_ext.as_os_str().to_owned();
    path.push(".md");
    let source = fs::read_to_string(path)?;
    Ok(parse_flat(&source))
}

/// Render every `.md` file under `dir`, keyed by its `/`-separated path
/// without extension.
///
/// Unreadable files are logged and skipped. A missing directory yields
/// nothing.
#[must_use]
pub fn load_flat_dir(dir: &Path) -> Vec<(String, RenderedDoc)> {
    let mut docs = Vec::new();
    collect(dir, "", &mut docs);
    docs
}

fn collect(dir: &Path, prefix: &str, docs: &mut Vec<(String, RenderedDoc)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Failed to list content directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            file_name
        } else {
            format!("{prefix}/{file_name}")
        };

        if path.is_dir() {
            collect(&path, &rel, docs);
            continue;
        }
        let Some(name) = rel.strip_suffix(".md") else {
            continue;
        };

        match fs::read_to_string(&path) {
            Ok(source) => docs.push((name.to_owned(), parse_flat(&source))),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to read content file"),
        }
    }
}
