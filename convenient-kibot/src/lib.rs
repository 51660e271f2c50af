//! convenient-kibot - CI orchestration around KiBot and KiAuto
//!
//! Container side, one project per invocation:
//!
//! 1. [`paths`]: resolve scratch and input paths
//! 2. [`scratch`]: copy the project to a scratch location (removed on drop)
//! 3. [`preprocess`]: point the board's 3D library token at the bundled library
//! 4. [`build`]: run KiBot
//! 5. [`render`]: run `pcbnew_do render_3d`
//!
//! [`pipeline::Pipeline`] ties these together. [`ownership`] hands mounted
//! volumes to the host user before the pipeline runs.
//!
//! Host side, [`discovery`] finds projects and [`container`] runs each one in
//! the CI image.
//!
//! ```no_run
//! use convenient_kibot::{CiConfig, Pipeline, PipelineRequest};
//! # async fn example() -> convenient_kibot::Result<()> {
//! let pipeline = Pipeline::new(CiConfig::default())?;
//! let report = pipeline.run(&PipelineRequest::new("demo", "out_dir")).await?;
//! println!("{}", report.render_image.display());
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod config;
pub mod container;
pub mod discovery;
pub mod error;
pub mod ownership;
pub mod paths;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod scratch;
pub mod tool;

pub use config::CiConfig;
pub use container::{CiSummary, ContainerRunner, ProjectResult};
pub use discovery::{Project, find_projects};
pub use error::{CiError, Result};
pub use ownership::{HostIdentity, OwnershipFix};
pub use paths::ProjectPaths;
pub use pipeline::{Pipeline, PipelineReport, PipelineRequest};
pub use preprocess::BoardPreprocessor;
pub use tool::{ExternalTool, ToolConfig, ToolOutput};
