//! Host-side dispatch of projects into the CI container
//!
//! Each discovered project gets a fresh `<ci_root>/<name>` output folder and
//! one `docker run` that mounts the project and that folder, forwarding the
//! host ids so the container can hand ownership back.

use crate::config::ContainerConfig;
use crate::discovery::Project;
use crate::error::{CiError, Result};
use crate::ownership::HostIdentity;
use crate::tool::{ExternalTool, ToolOutput};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, instrument};

/// Shortest output path we are willing to `rm -r`
pub const MIN_OUTPUT_PATH_LEN: usize = 5;

/// Name of the output mount inside the container
pub const CONTAINER_OUT_DIR: &str = "out_dir";

/// Clear and recreate a project output directory
pub fn prepare_output_dir(out_dir: &Path) -> Result<()> {
    if out_dir.as_os_str().len() < MIN_OUTPUT_PATH_LEN {
        return Err(CiError::InvalidOutputDir(
            out_dir.to_path_buf(),
            "path may be invalid".to_string(),
        ));
    }

    if let Ok(meta) = out_dir.symlink_metadata() {
        if !meta.is_dir() {
            return Err(CiError::InvalidOutputDir(
                out_dir.to_path_buf(),
                "not a directory".to_string(),
            ));
        }
        fs::remove_dir_all(out_dir)?;
    }

    fs::create_dir_all(out_dir)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResult {
    pub name: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub output: Option<ToolOutput>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CiSummary {
    pub projects: Vec<ProjectResult>,
}

impl CiSummary {
    pub fn ok(&self) -> bool {
        self.projects.iter().all(|p| p.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProjectResult> {
        self.projects.iter().filter(|p| !p.success)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_report(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

pub struct ContainerRunner {
    config: ContainerConfig,
    identity: HostIdentity,
}

impl ContainerRunner {
    pub fn new(config: ContainerConfig, identity: HostIdentity) -> Self {
        Self { config, identity }
    }

    /// Assemble the `docker run` line; both directories must exist
    pub fn command(&self, project: &Project, out_dir: &Path) -> Result<ExternalTool> {
        let project_dir = project.path.canonicalize()?;
        let out_dir = out_dir.canonicalize()?;
        let workdir = self.config.workdir.trim_end_matches('/');

        Ok(ExternalTool::new(&self.config.engine)
            .args(["run", "--rm"])
            .arg("--volume")
            .arg(format!(
                "{}:{}/{}",
                project_dir.display(),
                workdir,
                project.name
            ))
            .arg("--volume")
            .arg(format!(
                "{}:{}/{}",
                out_dir.display(),
                workdir,
                CONTAINER_OUT_DIR
            ))
            .arg("--env")
            .arg(format!("HOST_UID={}", self.identity.uid))
            .arg("--env")
            .arg(format!("HOST_GID={}", self.identity.gid))
            .arg("--workdir")
            .arg(workdir)
            .arg(&self.config.image)
            .args(&self.config.command)
            .arg(&project.name)
            .arg(CONTAINER_OUT_DIR))
    }

    /// Run one project; failures are captured in the result, not returned
    #[instrument(skip_all, fields(project = %project.name))]
    pub async fn run_project(&self, project: &Project, ci_root: &Path) -> ProjectResult {
        info!("Running CI for '{}'", project.name);
        match self.try_run_project(project, ci_root).await {
            Ok(output) => ProjectResult {
                name: project.name.clone(),
                success: output.success(),
                exit_code: Some(output.status()),
                error: None,
                output: Some(output),
            },
            Err(e) => {
                error!("CI for '{}' could not run: {}", project.name, e);
                ProjectResult {
                    name: project.name.clone(),
                    success: false,
                    exit_code: None,
                    error: Some(e.to_string()),
                    output: None,
                }
            }
        }
    }

    async fn try_run_project(&self, project: &Project, ci_root: &Path) -> Result<ToolOutput> {
        let out_dir = ci_root.join(&project.name);
        prepare_output_dir(&out_dir)?;
        self.command(project, &out_dir)?.run().await
    }

    /// Run every project in order, one at a time
    pub async fn run_all(&self, projects: &[Project], ci_root: &Path) -> CiSummary {
        let mut summary = CiSummary::default();
        for project in projects {
            summary.projects.push(self.run_project(project, ci_root).await);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn refuses_short_paths() {
        let err = prepare_output_dir(Path::new("ci")).unwrap_err();
        assert!(matches!(err, CiError::InvalidOutputDir(..)));
    }

    #[test]
    fn refuses_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("output");
        fs::write(&file, "not a dir").unwrap();

        let err = prepare_output_dir(&file).unwrap_err();
        assert!(matches!(err, CiError::InvalidOutputDir(..)));
        assert!(file.is_file());
    }

    #[test]
    fn recreates_existing_directory() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("ci/demo");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("old-render.png"), "png").unwrap();

        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn command_mounts_project_and_output() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let project = Project {
            name: "demo".to_string(),
            path: root.join("demo"),
            config: root.join("demo/demo.kibot.yaml"),
        };
        fs::create_dir_all(&project.path).unwrap();
        let out = root.join("ci/demo");
        fs::create_dir_all(&out).unwrap();

        let runner = ContainerRunner::new(
            ContainerConfig::default(),
            HostIdentity { uid: 1000, gid: 1001 },
        );
        let tool = runner.command(&project, &out).unwrap();

        let args: Vec<String> = tool
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(tool.program(), "docker");
        assert_eq!(
            args,
            vec![
                "run".to_string(),
                "--rm".to_string(),
                "--volume".to_string(),
                format!("{}:/build/demo", root.join("demo").display()),
                "--volume".to_string(),
                format!("{}:/build/out_dir", out.display()),
                "--env".to_string(),
                "HOST_UID=1000".to_string(),
                "--env".to_string(),
                "HOST_GID=1001".to_string(),
                "--workdir".to_string(),
                "/build".to_string(),
                "kibot-ci:latest".to_string(),
                "kibot-ci".to_string(),
                "run".to_string(),
                "demo".to_string(),
                "out_dir".to_string(),
            ]
        );
    }

    #[test]
    fn summary_serializes_failures() {
        let summary = CiSummary {
            projects: vec![
                ProjectResult {
                    name: "amp".to_string(),
                    success: true,
                    exit_code: Some(0),
                    error: None,
                    output: None,
                },
                ProjectResult {
                    name: "psu".to_string(),
                    success: false,
                    exit_code: None,
                    error: Some("Missing file: psu/psu.sch".to_string()),
                    output: None,
                },
            ],
        };
        assert!(!summary.ok());
        assert_eq!(summary.failed().count(), 1);

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["projects"][0]["name"], "amp");
        assert!(json["projects"][0].get("error").is_none());
        assert_eq!(json["projects"][1]["error"], "Missing file: psu/psu.sch");
    }
}
