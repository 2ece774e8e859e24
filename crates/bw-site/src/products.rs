//! Product showcase read from `products/projects.json`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A project built with the framework.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Project {
    pub name: String,
    /// Thumbnail image path under `products/images/`.
    pub thumb: String,
    pub desc: String,
    pub url: String,
    /// Source repository URL.
    pub src: String,
    pub submitter: String,
    pub date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

/// Error loading the showcase.
#[derive(Debug, thiserror::Error)]
pub enum ProductsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid projects file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load projects, newest first.
///
/// The file lists projects oldest first; the order is reversed.
pub fn load_projects(path: &Path) -> Result<Vec<Project>, ProductsError> {
    let data = fs::read(path)?;
    let file: ProjectsFile = serde_json::from_slice(&data)?;
    let mut projects = file.projects;
    projects.reverse();
    Ok(projects)
}
