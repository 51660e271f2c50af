//! Scratch copies of project directories
//!
//! [`ScratchDir`] owns the working copy for one CI run and removes it when
//! dropped, so every exit path of the pipeline releases it.

use crate::error::{CiError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Guard over a transient directory tree
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Copy `source` to `dest` and take ownership of `dest`.
    ///
    /// A stale `dest` left behind by an interrupted run is removed first.
    /// `dest` must not overlap `source`, otherwise that removal would take
    /// the source with it.
    pub fn copy_from(source: &Path, dest: &Path) -> Result<Self> {
        let source_real = source.canonicalize()?;
        let dest_real = canonical_location(dest)?;
        if dest_real.starts_with(&source_real) || source_real.starts_with(&dest_real) {
            return Err(CiError::InvalidArguments(format!(
                "scratch copy {} overlaps project directory {}",
                dest.display(),
                source.display()
            )));
        }

        if dest.symlink_metadata().is_ok() {
            debug!("Removing stale scratch copy {}", dest.display());
            remove_path(dest)?;
        }

        // Owned from here on, even if the copy fails halfway
        let guard = Self {
            path: dest.to_path_buf(),
        };
        copy_tree(source, dest)?;
        debug!("Copied {} to {}", source.display(), dest.display());
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.symlink_metadata().is_err() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch copy {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove scratch copy {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Canonical form of a path that may not exist yet, resolved through its
/// closest existing ancestor
fn canonical_location(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    loop {
        if let Ok(base) = current.canonicalize() {
            return Ok(missing
                .iter()
                .rev()
                .fold(base, |acc: PathBuf, name| acc.join(name)));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                current = parent;
            }
            _ => return Ok(absolute.clone()),
        }
    }
}

fn remove_path(path: &Path) -> Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Recursive copy preserving symlinks and permissions
fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(root: &Path) -> PathBuf {
        let src = root.join("demo");
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::write(src.join("demo.kicad_pcb"), "(kicad_pcb)").unwrap();
        fs::write(src.join("lib/parts.lib"), "EESchema-LIBRARY").unwrap();
        std::os::unix::fs::symlink("demo.kicad_pcb", src.join("link.kicad_pcb")).unwrap();
        src
    }

    #[test]
    fn copies_tree_and_removes_on_drop() {
        let tmp = TempDir::new().unwrap();
        let src = project(tmp.path());
        let dest = tmp.path().join("scratch/demo");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();

        {
            let guard = ScratchDir::copy_from(&src, &dest).unwrap();
            assert_eq!(guard.path(), dest.as_path());
            assert_eq!(
                fs::read_to_string(dest.join("lib/parts.lib")).unwrap(),
                "EESchema-LIBRARY"
            );
            assert_eq!(
                fs::read_link(dest.join("link.kicad_pcb")).unwrap(),
                PathBuf::from("demo.kicad_pcb")
            );
        }

        assert!(!dest.exists());
        assert!(src.join("demo.kicad_pcb").exists());
    }

    #[test]
    fn replaces_stale_copy() {
        let tmp = TempDir::new().unwrap();
        let src = project(tmp.path());
        let dest = tmp.path().join("stale");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("leftover.txt"), "old").unwrap();

        let guard = ScratchDir::copy_from(&src, &dest).unwrap();
        assert!(!dest.join("leftover.txt").exists());
        assert!(dest.join("demo.kicad_pcb").exists());
        drop(guard);
        assert!(!dest.exists());
    }

    #[test]
    fn refuses_scratch_equal_to_source() {
        let tmp = TempDir::new().unwrap();
        let src = project(tmp.path());

        // Same directory spelled differently
        let dest = tmp.path().join("lib/../demo");
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        let err = ScratchDir::copy_from(&src, &dest).unwrap_err();
        assert!(matches!(err, CiError::InvalidArguments(_)));
        assert!(src.join("demo.kicad_pcb").exists());
        assert!(src.join("lib/parts.lib").exists());
    }

    #[test]
    fn refuses_nested_scratch() {
        let tmp = TempDir::new().unwrap();
        let src = project(tmp.path());

        // Scratch below the source, not created yet
        let inside = src.join("tmp/demo");
        let err = ScratchDir::copy_from(&src, &inside).unwrap_err();
        assert!(matches!(err, CiError::InvalidArguments(_)));
        assert!(!src.join("tmp").exists());

        // Source below the scratch copy
        let err = ScratchDir::copy_from(&src, tmp.path()).unwrap_err();
        assert!(matches!(err, CiError::InvalidArguments(_)));
        assert!(src.join("demo.kicad_pcb").exists());
    }

    #[test]
    fn failed_copy_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("scratch");

        let result = ScratchDir::copy_from(&tmp.path().join("missing"), &dest);
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
