//! 3D render through KiAuto's `pcbnew_do render_3d`

use crate::config::RenderConfig;
use crate::error::{CiError, Result};
use crate::paths::{ProjectPaths, render_image_name};
use crate::tool::{ExternalTool, ToolOutput};
use std::collections::BTreeMap;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct RenderInvoker {
    config: RenderConfig,
    env: BTreeMap<String, String>,
}

impl RenderInvoker {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Recording size options come before the subcommand, the rest after it
    pub fn command(&self, paths: &ProjectPaths) -> ExternalTool {
        ExternalTool::new(&self.config.tool)
            .envs(&self.env)
            .arg("--rec_width")
            .arg(self.config.width.to_string())
            .arg("--rec_height")
            .arg(self.config.height.to_string())
            .arg("render_3d")
            .arg("--output_name")
            .arg(render_image_name(&paths.project))
            .arg(&paths.board_file)
            .arg(&paths.out_dir)
    }

    pub async fn run(&self, paths: &ProjectPaths) -> Result<ToolOutput> {
        info!(
            "Rendering '{}' at {}x{} to {}",
            paths.project,
            self.config.width,
            self.config.height,
            paths.render_image.display()
        );
        let output = self.command(paths).run().await?;
        output.echo();

        if !output.success() {
            error!(
                "{} failed for '{}' with status {}",
                output.program,
                paths.project,
                output.status()
            );
            return Err(CiError::RenderFailed {
                status: output.status(),
            });
        }

        info!("Render of '{}' finished in {} ms", paths.project, output.duration_ms);
        Ok(output)
    }
}
