//! kibot-ci command-line interface
//!
//! - `run`: container side, build and render one project
//! - `scan`: host side, run every project found in a tree through the CI image
//!
//! `--config` and `--verbose` belong before the subcommand. Anything after
//! `run <project> <out_dir>` goes to KiBot untouched, its own `--verbose`
//! and `--config` included.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod run;
pub mod scan;

/// kibot-ci - KiCad CI around KiBot and KiAuto
#[derive(Parser)]
#[command(name = "kibot-ci")]
#[command(about = "Build and render KiCad projects in CI")]
#[command(version)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, env = "KIBOT_CI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print debug information
    #[arg(long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and render one project (inside the CI container)
    Run(RunArgs),

    /// Find projects and run each one in the CI container
    Scan(ScanArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Project name; `<name>/<name>.{sch,kicad_pcb,kibot.yaml}` must exist
    pub project: String,

    /// Directory receiving the KiBot outputs and `<name>-render.png`
    pub out_dir: PathBuf,

    /// Forwarded verbatim to KiBot (`run` flags of kibot-ci go before the project)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,

    /// Host user id to hand the mounted volume to
    #[arg(long, env = "HOST_UID")]
    pub host_uid: Option<u32>,

    /// Host group id to hand the mounted volume to
    #[arg(long, env = "HOST_GID")]
    pub host_gid: Option<u32>,

    /// Directory holding the project folders
    #[arg(long, env = "KIBOT_CI_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Directory for the scratch copy
    #[arg(long, env = "KIBOT_CI_SCRATCH")]
    pub scratch_root: Option<PathBuf>,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Tree to search for `*.kibot.yaml` projects
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Output folder, one subdirectory per project
    #[arg(long, default_value = "ci")]
    pub ci_dir: PathBuf,

    /// Container image to run
    #[arg(long, env = "KIBOT_CI_IMAGE")]
    pub image: Option<String>,

    /// Write a JSON summary here
    #[arg(long)]
    pub report: Option<PathBuf>,
}
