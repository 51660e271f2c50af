//! Project build-and-export pipeline
//!
//! Straight line: resolve paths, check inputs, copy to scratch, rewrite the
//! board, build, render. The scratch guard is dropped on every return path.

use crate::build::BuildInvoker;
use crate::config::CiConfig;
use crate::error::{CiError, Result};
use crate::paths::ProjectPaths;
use crate::preprocess::BoardPreprocessor;
use crate::render::RenderInvoker;
use crate::scratch::ScratchDir;
use crate::tool::ToolOutput;
use std::path::PathBuf;
use tracing::{info, instrument};

/// One invocation of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub project: String,
    pub out_dir: PathBuf,
    /// Forwarded verbatim to the build tool
    pub extra_args: Vec<String>,
}

impl PipelineRequest {
    pub fn new(project: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            out_dir: out_dir.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub project: String,
    pub substitutions: usize,
    pub build: ToolOutput,
    pub render: ToolOutput,
    pub render_image: PathBuf,
}

pub struct Pipeline {
    config: CiConfig,
    preprocessor: BoardPreprocessor,
    build: BuildInvoker,
    render: RenderInvoker,
}

impl Pipeline {
    pub fn new(config: CiConfig) -> Result<Self> {
        let preprocessor = BoardPreprocessor::from_config(&config.library)?;
        let build = BuildInvoker::new(config.build.clone()).with_env(config.env.clone());
        let render = RenderInvoker::new(config.render.clone()).with_env(config.env.clone());
        Ok(Self {
            config,
            preprocessor,
            build,
            render,
        })
    }

    pub fn resolve(&self, request: &PipelineRequest) -> Result<ProjectPaths> {
        ProjectPaths::resolve(
            &request.project,
            &request.out_dir,
            &self.config.project_root,
            &self.config.scratch_root,
        )
    }

    #[instrument(skip_all, fields(project = %request.project))]
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineReport> {
        let paths = self.resolve(request)?;

        for required in paths.required_sources() {
            if !required.is_file() {
                return Err(CiError::MissingFile(required));
            }
        }

        info!(
            "Copying {} to {}",
            paths.source_dir.display(),
            paths.scratch_dir.display()
        );
        let _scratch = ScratchDir::copy_from(&paths.source_dir, &paths.scratch_dir)?;

        tokio::fs::create_dir_all(&paths.out_dir).await?;

        let substitutions = self.preprocessor.apply(&paths.board_file).await?;
        let build = self.build.run(&paths, &request.extra_args).await?;
        let render = self.render.run(&paths).await?;

        info!("CI for '{}' succeeded", paths.project);
        Ok(PipelineReport {
            project: paths.project.clone(),
            substitutions,
            build,
            render,
            render_image: paths.render_image.clone(),
        })
    }
}
