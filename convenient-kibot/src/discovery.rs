//! Project discovery
//!
//! A CI project is any directory holding a `<name>.kibot.yaml` file.

use crate::paths::CONFIG_EXT;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    /// Directory containing the project files
    pub path: PathBuf,
    /// The `.kibot.yaml` file that marked it
    pub config: PathBuf,
}

/// Find all projects below `root`, sorted by name.
///
/// Hidden directories and anything under `skip` (the CI output folder) are
/// not searched. The first project found for a given name wins. Paths are
/// canonical when the root can be canonicalized.
pub fn find_projects(root: &Path, skip: Option<&Path>) -> Vec<Project> {
    info!("Scanning {} for projects...", root.display());
    let suffix = format!(".{}", CONFIG_EXT);
    let mut projects: BTreeMap<String, Project> = BTreeMap::new();

    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let skip = skip.and_then(|s| s.canonicalize().ok());
    let skip = skip.as_deref();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && skip.is_none_or(|s| e.path() != s));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(name) = file_name.strip_suffix(suffix.as_str()) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let path = entry
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.clone());

        if let Some(existing) = projects.get(name) {
            warn!(
                "Ignoring duplicate project '{}' in {} (already found in {})",
                name,
                path.display(),
                existing.path.display()
            );
            continue;
        }

        info!("Found '{}'", name);
        projects.insert(
            name.to_string(),
            Project {
                name: name.to_string(),
                path,
                config: entry.path().to_path_buf(),
            },
        );
    }

    if projects.is_empty() {
        warn!("No electronics projects found, each project needs a *{} file", suffix);
    }

    projects.into_values().collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "kibot:\n  version: 1\n").unwrap();
    }

    #[test]
    fn finds_nested_projects_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("power/psu/psu.kibot.yaml"));
        touch(&tmp.path().join("amp/amp.kibot.yaml"));
        touch(&tmp.path().join("amp/notes.yaml"));

        let projects = find_projects(tmp.path(), None);
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["amp", "psu"]);
        let root = tmp.path().canonicalize().unwrap();
        assert_eq!(projects[1].path, root.join("power/psu"));
        assert_eq!(projects[1].config, root.join("power/psu/psu.kibot.yaml"));
    }

    #[test]
    fn skips_hidden_and_output_dirs() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join(".git/x/x.kibot.yaml"));
        touch(&tmp.path().join("ci/old/old.kibot.yaml"));
        touch(&tmp.path().join("board/board.kibot.yaml"));

        let skip = tmp.path().join("ci");
        let projects = find_projects(tmp.path(), Some(&skip));
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "board");
    }

    #[test]
    fn duplicate_names_keep_the_first() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a/demo.kibot.yaml"));
        touch(&tmp.path().join("b/demo.kibot.yaml"));

        let projects = find_projects(tmp.path(), None);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].path, tmp.path().canonicalize().unwrap().join("a"));
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tmp = TempDir::new().unwrap();
        assert!(find_projects(tmp.path(), None).is_empty());
    }
}
