//! Error types shared by the container-side pipeline and the host-side runner

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a CI invocation
#[derive(Debug, Error)]
pub enum CiError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Token '{token}' not found in {}", .path.display())]
    TokenNotFound { token: String, path: PathBuf },

    #[error("Build failed with exit status {status}")]
    BuildFailed { status: i32 },

    #[error("Render failed with exit status {status}")]
    RenderFailed { status: i32 },

    #[error("Failed to start '{program}': {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid output directory {}: {}", .0.display(), .1)]
    InvalidOutputDir(PathBuf, String),

    #[error("Ownership fix failed: {0}")]
    Ownership(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CiError {
    /// Process exit code to surface for this error.
    ///
    /// Tool failures propagate the tool's own status, everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CiError::BuildFailed { status } | CiError::RenderFailed { status } => *status,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failures_keep_their_status() {
        assert_eq!(CiError::BuildFailed { status: 3 }.exit_code(), 3);
        assert_eq!(CiError::RenderFailed { status: 2 }.exit_code(), 2);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(CiError::InvalidArguments("x".into()).exit_code(), 1);
        assert_eq!(CiError::MissingFile(PathBuf::from("a.sch")).exit_code(), 1);
        assert_eq!(CiError::Ownership("denied".into()).exit_code(), 1);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = CiError::MissingFile(PathBuf::from("demo/demo.sch"));
        assert_eq!(err.to_string(), "Missing file: demo/demo.sch");
    }
}
