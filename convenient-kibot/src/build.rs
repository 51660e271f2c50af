//! KiBot invocation

use crate::error::{CiError, Result};
use crate::paths::ProjectPaths;
use crate::tool::{ExternalTool, ToolConfig, ToolOutput};
use std::collections::BTreeMap;
use tracing::{error, info};

/// Runs the board/schematic compiler for one project
#[derive(Debug, Clone)]
pub struct BuildInvoker {
    tool: ToolConfig,
    env: BTreeMap<String, String>,
}

impl BuildInvoker {
    pub fn new(tool: ToolConfig) -> Self {
        Self {
            tool,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// `-c <config> -e <schematic> -b <board> -d <out_dir> [extra...]`
    pub fn command(&self, paths: &ProjectPaths, extra_args: &[String]) -> ExternalTool {
        ExternalTool::new(&self.tool)
            .envs(&self.env)
            .arg("-c")
            .arg(&paths.config_file)
            .arg("-e")
            .arg(&paths.schematic_file)
            .arg("-b")
            .arg(&paths.board_file)
            .arg("-d")
            .arg(&paths.out_dir)
            .args(extra_args)
    }

    pub async fn run(&self, paths: &ProjectPaths, extra_args: &[String]) -> Result<ToolOutput> {
        info!("Building '{}' into {}", paths.project, paths.out_dir.display());
        let output = self.command(paths, extra_args).run().await?;
        output.echo();

        if !output.success() {
            error!(
                "{} failed for '{}' with status {}",
                output.program,
                paths.project,
                output.status()
            );
            return Err(CiError::BuildFailed {
                status: output.status(),
            });
        }

        info!("Build of '{}' finished in {} ms", paths.project, output.duration_ms);
        Ok(output)
    }
}
