//! Host-side scan: run every project in the tree through the CI container

use super::ScanArgs;
use convenient_kibot::{CiConfig, ContainerRunner, HostIdentity, Result, find_projects};
use std::path::Path;

/// Returns whether every project passed
pub fn execute(args: ScanArgs, config_file: Option<&Path>) -> Result<bool> {
    let mut config = CiConfig::load_or_default(config_file)?;
    if let Some(image) = args.image {
        config.container.image = image;
    }

    let projects = find_projects(&args.root, Some(&args.ci_dir));
    if projects.is_empty() {
        println!("No electronics projects found!");
        println!("Note: each project needs a <name>.kibot.yaml file.");
        return Ok(true);
    }
    println!("Found {} project(s):", projects.len());
    for project in &projects {
        println!("  • {} ({})", project.name, project.path.display());
    }

    let runner = ContainerRunner::new(config.container, HostIdentity::current());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(runner.run_all(&projects, &args.ci_dir));

    for result in &summary.projects {
        println!("\n==== CI for '{}' ====", result.name);
        if let Some(output) = &result.output {
            println!("++++ RESULT:");
            output.echo();
        }
        if let Some(error) = &result.error {
            println!("Error: {}", error);
        }
        if result.success {
            println!("__ OK __");
        } else {
            println!("__ FAIL __");
        }
    }

    if let Some(report) = &args.report {
        summary.write_report(report)?;
        println!("\nReport written to {}", report.display());
    }

    if !summary.ok() {
        let failed: Vec<&str> = summary.failed().map(|p| p.name.as_str()).collect();
        println!("\n__ CI FAILED! __ ({})", failed.join(", "));
        return Ok(false);
    }

    println!("\n✅ All {} project(s) passed", summary.projects.len());
    Ok(true)
}
