//! Host user ownership fix for the CI container
//!
//! Files written into a mounted volume belong to whoever the container runs
//! as. To hand the host user their artifacts, the container starts as root,
//! gives the home and library directories to the host ids, then drops to
//! those ids before any tool runs. The ids are passed in explicitly.

use crate::error::{CiError, Result};
use nix::unistd::{Gid, Uid, chown, geteuid, getgid, getuid, setgid, setgroups, setuid};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Numeric ids of the invoking host user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: u32,
    pub gid: u32,
}

impl HostIdentity {
    /// Both ids are needed; anything less means "leave ownership alone"
    pub fn from_parts(uid: Option<u32>, gid: Option<u32>) -> Option<Self> {
        match (uid, gid) {
            (Some(uid), Some(gid)) => Some(Self { uid, gid }),
            _ => None,
        }
    }

    /// Ids of the current process
    pub fn current() -> Self {
        Self {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
        }
    }

    fn uid(&self) -> Uid {
        Uid::from_raw(self.uid)
    }

    fn gid(&self) -> Gid {
        Gid::from_raw(self.gid)
    }
}

pub fn running_as_root() -> bool {
    geteuid().is_root()
}

#[derive(Debug, Clone)]
pub struct OwnershipFix {
    identity: HostIdentity,
    paths: Vec<PathBuf>,
}

impl OwnershipFix {
    pub fn new(identity: HostIdentity, paths: Vec<PathBuf>) -> Self {
        Self { identity, paths }
    }

    /// Recursively hand every configured path to the host ids.
    ///
    /// Returns the number of entries changed. Missing paths are skipped.
    pub fn apply(&self) -> Result<usize> {
        let mut changed = 0;
        for root in &self.paths {
            if root.symlink_metadata().is_err() {
                warn!("Ownership path {} does not exist, skipping", root.display());
                continue;
            }
            changed += self.chown_tree(root)?;
            info!(
                "Changed ownership of {} to {}:{}",
                root.display(),
                self.identity.uid,
                self.identity.gid
            );
        }
        Ok(changed)
    }

    fn chown_tree(&self, root: &Path) -> Result<usize> {
        let mut changed = 0;
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| CiError::Ownership(e.to_string()))?;
            let path = entry.path();
            if entry.path_is_symlink() {
                std::os::unix::fs::lchown(path, Some(self.identity.uid), Some(self.identity.gid))
                    .map_err(|e| CiError::Ownership(format!("{}: {}", path.display(), e)))?;
            } else {
                chown(path, Some(self.identity.uid()), Some(self.identity.gid()))
                    .map_err(|e| CiError::Ownership(format!("{}: {}", path.display(), e)))?;
            }
            changed += 1;
        }
        debug!("{} entries under {}", changed, root.display());
        Ok(changed)
    }

    /// Switch the whole process to the host ids. Group first, user last.
    pub fn drop_privileges(&self) -> Result<()> {
        let gid = self.identity.gid();
        setgroups(&[gid]).map_err(|e| CiError::Ownership(format!("setgroups: {}", e)))?;
        setgid(gid).map_err(|e| CiError::Ownership(format!("setgid: {}", e)))?;
        setuid(self.identity.uid()).map_err(|e| CiError::Ownership(format!("setuid: {}", e)))?;
        info!(
            "Running as {}:{}",
            self.identity.uid, self.identity.gid
        );
        Ok(())
    }
}
