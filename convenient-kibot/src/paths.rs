//! Project path resolution
//!
//! Pure computation of every path a CI run touches. Nothing here looks at
//! the filesystem.

use crate::error::{CiError, Result};
use std::path::{Path, PathBuf};

pub const SCHEMATIC_EXT: &str = "sch";
pub const BOARD_EXT: &str = "kicad_pcb";
pub const CONFIG_EXT: &str = "kibot.yaml";

/// Paths for one project run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub project: String,
    /// Original project directory
    pub source_dir: PathBuf,
    /// Transient copy of `source_dir`
    pub scratch_dir: PathBuf,
    pub config_file: PathBuf,
    pub board_file: PathBuf,
    pub schematic_file: PathBuf,
    pub out_dir: PathBuf,
    pub render_image: PathBuf,
}

impl ProjectPaths {
    /// Resolve all paths for `project` writing into `out_dir`.
    ///
    /// `project_root` holds the original `<project>/` folder and
    /// `scratch_root` receives the working copy.
    pub fn resolve(
        project: &str,
        out_dir: impl AsRef<Path>,
        project_root: impl AsRef<Path>,
        scratch_root: impl AsRef<Path>,
    ) -> Result<Self> {
        let out_dir = out_dir.as_ref();
        if project.is_empty() {
            return Err(CiError::InvalidArguments(
                "project name must not be empty".to_string(),
            ));
        }
        if out_dir.as_os_str().is_empty() {
            return Err(CiError::InvalidArguments(
                "output directory must not be empty".to_string(),
            ));
        }

        let scratch_dir = scratch_root.as_ref().join(project);
        Ok(Self {
            project: project.to_string(),
            source_dir: project_root.as_ref().join(project),
            config_file: scratch_dir.join(file_name(project, CONFIG_EXT)),
            board_file: scratch_dir.join(file_name(project, BOARD_EXT)),
            schematic_file: scratch_dir.join(file_name(project, SCHEMATIC_EXT)),
            scratch_dir,
            render_image: out_dir.join(render_image_name(project)),
            out_dir: out_dir.to_path_buf(),
        })
    }

    /// `<source_dir>/<project>.<ext>`
    pub fn source_file(&self, ext: &str) -> PathBuf {
        self.source_dir.join(file_name(&self.project, ext))
    }

    /// The three files a project directory must contain
    pub fn required_sources(&self) -> [PathBuf; 3] {
        [
            self.source_file(SCHEMATIC_EXT),
            self.source_file(BOARD_EXT),
            self.source_file(CONFIG_EXT),
        ]
    }
}

fn file_name(project: &str, ext: &str) -> String {
    format!("{}.{}", project, ext)
}

/// Name of the 3D render written into the output directory
pub fn render_image_name(project: &str) -> String {
    format!("{}-render.png", project)
}
