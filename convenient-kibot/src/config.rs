//! CI configuration
//!
//! All knobs live in one serde struct so a YAML file can override any subset
//! of them. Defaults reproduce the layout of the CI container: projects are
//! mounted under the working directory, scratch copies go to `/tmp` and the
//! 3D model library is the one shipped with KiCad.

use crate::error::Result;
use crate::tool::ToolConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Complete CI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CiConfig {
    /// Directory holding `<project>/` folders (container side)
    pub project_root: PathBuf,
    /// Directory receiving `<project>/` scratch copies
    pub scratch_root: PathBuf,
    /// 3D model library substitution
    pub library: LibraryConfig,
    /// Board/schematic compiler (KiBot)
    pub build: ToolConfig,
    /// 3D renderer (KiAuto pcbnew_do)
    pub render: RenderConfig,
    /// Paths handed to the host user before dropping privileges
    pub ownership: OwnershipConfig,
    /// Host-side container dispatch
    pub container: ContainerConfig,
    /// Extra environment for every external tool
    pub env: BTreeMap<String, String>,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            scratch_root: PathBuf::from("/tmp"),
            library: LibraryConfig::default(),
            build: ToolConfig::new("kibot"),
            render: RenderConfig::default(),
            ownership: OwnershipConfig::default(),
            container: ContainerConfig::default(),
            env: BTreeMap::new(),
        }
    }
}

impl CiConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading CI config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML, missing keys keep their defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Symbolic 3D library token and the path it resolves to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    pub token: String,
    pub path: String,
    /// Fail when the board does not mention the token at all
    pub require_token: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            token: "${KISYS3DMOD}".to_string(),
            path: "/usr/share/kicad/modules/packages3d".to_string(),
            require_token: false,
        }
    }
}

/// Renderer invocation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub tool: ToolConfig,
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tool: ToolConfig::new("pcbnew_do"),
            width: 1366,
            height: 960,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OwnershipConfig {
    pub home_dir: PathBuf,
    pub library_dir: PathBuf,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            home_dir: PathBuf::from("/home/kibot"),
            library_dir: PathBuf::from("/usr/share/kicad"),
        }
    }
}

impl OwnershipConfig {
    pub fn paths(&self) -> Vec<PathBuf> {
        vec![self.home_dir.clone(), self.library_dir.clone()]
    }
}

/// Host-side `docker run` settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerConfig {
    /// Container engine binary
    pub engine: ToolConfig,
    pub image: String,
    /// Mount point of projects and outputs inside the container
    pub workdir: String,
    /// Command run inside the container, followed by `<project> out_dir`
    pub command: Vec<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            engine: ToolConfig::new("docker"),
            image: "kibot-ci:latest".to_string(),
            workdir: "/build".to_string(),
            command: vec!["kibot-ci".to_string(), "run".to_string()],
        }
    }
}
