//! Board file preprocessing
//!
//! KiCad boards reference 3D models through a symbolic library variable.
//! Inside the CI container that variable is not set, so the token is
//! rewritten to the bundled library path before KiBot sees the board.

use crate::config::LibraryConfig;
use crate::error::{CiError, Result};
use std::path::Path;
use tracing::{debug, info};

/// Literal token substitution on board files
#[derive(Debug, Clone)]
pub struct BoardPreprocessor {
    token: String,
    replacement: String,
    require_token: bool,
}

impl BoardPreprocessor {
    pub fn new(token: impl Into<String>, replacement: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let replacement = replacement.into();
        if token.is_empty() {
            return Err(CiError::InvalidArguments(
                "library token must not be empty".to_string(),
            ));
        }
        // Re-running must be a no-op
        if replacement.contains(&token) {
            return Err(CiError::InvalidArguments(format!(
                "library path '{}' contains the token '{}'",
                replacement, token
            )));
        }
        Ok(Self {
            token,
            replacement,
            require_token: false,
        })
    }

    pub fn from_config(config: &LibraryConfig) -> Result<Self> {
        Ok(Self::new(&config.token, &config.path)?.require_token(config.require_token))
    }

    /// Fail with `TokenNotFound` when a board has nothing to substitute
    pub fn require_token(mut self, require: bool) -> Self {
        self.require_token = require;
        self
    }

    /// Substitute in memory, returning the new content and the count
    pub fn substitute(&self, content: &str) -> (String, usize) {
        let count = content.matches(self.token.as_str()).count();
        if count == 0 {
            return (content.to_string(), 0);
        }
        (content.replace(self.token.as_str(), &self.replacement), count)
    }

    /// Rewrite `board` in place, returning the number of replacements
    pub async fn apply(&self, board: &Path) -> Result<usize> {
        if !tokio::fs::try_exists(board).await? {
            return Err(CiError::MissingFile(board.to_path_buf()));
        }

        let content = tokio::fs::read_to_string(board).await?;
        let (updated, count) = self.substitute(&content);

        if count == 0 {
            if self.require_token {
                return Err(CiError::TokenNotFound {
                    token: self.token.clone(),
                    path: board.to_path_buf(),
                });
            }
            info!("No '{}' references in {}", self.token, board.display());
            return Ok(0);
        }

        tokio::fs::write(board, updated).await?;
        debug!(
            "Replaced {} x '{}' with '{}' in {}",
            count,
            self.token,
            self.replacement,
            board.display()
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    const BOARD: &str = r#"(kicad_pcb (version 20171130) (host pcbnew 5.1.9)
  (module Resistor_SMD:R_0603 (layer F.Cu)
    (model ${KISYS3DMOD}/Resistor_SMD.3dshapes/R_0603.wrl
      (at (xyz 0 0 0)))
  )
  (module Capacitor_SMD:C_0603 (layer F.Cu)
    (model ${KISYS3DMOD}/Capacitor_SMD.3dshapes/C_0603.wrl
      (at (xyz 0 0 0)))
  )
)
"#;

    fn preprocessor() -> BoardPreprocessor {
        BoardPreprocessor::new("${KISYS3DMOD}", "/usr/share/kicad/modules/packages3d").unwrap()
    }

    #[tokio::test]
    async fn replaces_every_occurrence() {
        let dir = TempDir::new().unwrap();
        let board = dir.path().join("demo.kicad_pcb");
        std::fs::write(&board, BOARD).unwrap();

        let count = preprocessor().apply(&board).await.unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&board).unwrap();
        assert!(!content.contains("${KISYS3DMOD}"));
        assert!(content.contains(
            "(model /usr/share/kicad/modules/packages3d/Resistor_SMD.3dshapes/R_0603.wrl"
        ));
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let board = dir.path().join("demo.kicad_pcb");
        std::fs::write(&board, BOARD).unwrap();

        let pre = preprocessor();
        pre.apply(&board).await.unwrap();
        let once = std::fs::read_to_string(&board).unwrap();

        assert_eq!(pre.apply(&board).await.unwrap(), 0);
        let twice = std::fs::read_to_string(&board).unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn missing_board_is_reported() {
        let dir = TempDir::new().unwrap();
        let board = dir.path().join("absent.kicad_pcb");

        match preprocessor().apply(&board).await {
            Err(CiError::MissingFile(path)) => assert_eq!(path, board),
            other => panic!("expected MissingFile, got {:?}", other),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn absent_token_is_logged_and_skipped() {
        let dir = TempDir::new().unwrap();
        let board = dir.path().join("plain.kicad_pcb");
        std::fs::write(&board, "(kicad_pcb (version 20171130))\n").unwrap();

        assert_eq!(preprocessor().apply(&board).await.unwrap(), 0);
        assert!(logs_contain("No '${KISYS3DMOD}' references"));
    }

    #[tokio::test]
    async fn absent_token_fails_when_required() {
        let dir = TempDir::new().unwrap();
        let board = dir.path().join("plain.kicad_pcb");
        std::fs::write(&board, "(kicad_pcb (version 20171130))\n").unwrap();

        let err = preprocessor().require_token(true).apply(&board).await.unwrap_err();
        assert!(matches!(err, CiError::TokenNotFound { .. }));
    }

    #[test]
    fn replacement_containing_token_is_rejected() {
        let err = BoardPreprocessor::new("${LIB}", "/opt/${LIB}/3d").unwrap_err();
        assert!(matches!(err, CiError::InvalidArguments(_)));
        assert!(BoardPreprocessor::new("", "/opt").is_err());
    }

    #[test]
    fn substitute_counts_matches() {
        let (out, count) = preprocessor().substitute("a ${KISYS3DMOD} b ${KISYS3DMOD}");
        assert_eq!(count, 2);
        assert_eq!(
            out,
            "a /usr/share/kicad/modules/packages3d b /usr/share/kicad/modules/packages3d"
        );
    }
}
