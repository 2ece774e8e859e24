//! `beeweb check` command implementation.
//!
//! Builds every locale's documentation tree the way the server does and
//! prints the tree with all build errors.

use std::path::PathBuf;

use bw_config::Config;
use bw_site::{DocRoot, NodeId};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Path to configuration file (default: auto-discover beeweb.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only check this locale.
    #[arg(short, long)]
    locale: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the locale is unknown, or
    /// any tree was built with errors.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let content = &config.content_resolved;

        let locales: Vec<&String> = match &self.locale {
            Some(locale) if content.locales.contains(locale) => vec![locale],
            Some(locale) => {
                return Err(CliError::Validation(format!("Unknown locale: {locale}")));
            }
            None => content.locales.iter().collect(),
        };

        let mut degraded = 0;
        for locale in locales {
            let dir = content.docs_dir().join(locale);
            output.info(&format!("{locale} ({})", dir.display()));

            let (tree, report) = match DocRoot::load(&dir) {
                Ok(loaded) => loaded,
                Err(e) => {
                    output.error(&format!("  {e}"));
                    degraded += 1;
                    continue;
                }
            };

            for line in tree_lines(&tree) {
                output.detail(&line);
            }
            if report.is_degraded() {
                degraded += 1;
                for error in &report.errors {
                    output.warning(&format!("  {error}"));
                }
            } else {
                output.success(&format!("  {} nodes, no errors", tree.len()));
            }
        }

        if degraded == 0 {
            Ok(())
        } else {
            Err(CliError::Validation(format!(
                "{degraded} locale(s) built with errors"
            )))
        }
    }
}

/// Indented outline of a tree, one node per line.
fn tree_lines(tree: &DocRoot) -> Vec<String> {
    let mut lines = Vec::new();
    push_children(tree, NodeId::ROOT, 1, &mut lines);
    lines
}

fn push_children(tree: &DocRoot, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    for (child_id, child) in tree.children(id) {
        let marker = if child.is_dir { "+" } else { "-" };
        let link = if child.link.is_empty() {
            String::new()
        } else {
            format!(" -> {}", child.link)
        };
        lines.push(format!("{}{marker} {}{link}", "  ".repeat(depth), child.name));
        push_children(tree, child_id, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_tree_lines() {
        let dir = tempfile::tempdir().unwrap();
        let intro = dir.path().join("intro");
        fs::create_dir_all(&intro).unwrap();
        fs::write(intro.join("index.md"), "---\nroot: true\nname: Intro\n---\n\nHi").unwrap();
        fs::write(
            intro.join("install.md"),
            "---\nname: Install\nlink: install\n---\n\nRun",
        )
        .unwrap();

        let (tree, report) = DocRoot::load(dir.path()).unwrap();
        assert!(!report.is_degraded());

        assert_eq!(
            tree_lines(&tree),
            vec!["  + Intro -> intro/", "    - Install -> install"]
        );
    }
}
