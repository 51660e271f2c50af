//! Container-side run: ownership fix, then build and render one project

use super::RunArgs;
use convenient_kibot::ownership::running_as_root;
use convenient_kibot::{
    CiConfig, HostIdentity, OwnershipFix, Pipeline, PipelineRequest, ProjectPaths, Result,
};
use std::path::Path;
use tracing::{info, warn};

pub fn execute(args: RunArgs, config_file: Option<&Path>) -> Result<()> {
    let mut config = CiConfig::load_or_default(config_file)?;
    if let Some(root) = args.project_root {
        config.project_root = root;
    }
    if let Some(root) = args.scratch_root {
        config.scratch_root = root;
    }

    // Reject bad input before touching ownership
    ProjectPaths::resolve(
        &args.project,
        &args.out_dir,
        &config.project_root,
        &config.scratch_root,
    )?;

    fix_ownership(HostIdentity::from_parts(args.host_uid, args.host_gid), &mut config)?;

    let request = PipelineRequest::new(args.project, args.out_dir).with_extra_args(args.extra);

    // One thread, one step at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(async {
        let pipeline = Pipeline::new(config)?;
        pipeline.run(&request).await
    })?;

    println!();
    println!("✅ {} built", report.project);
    println!("   3D model references rewritten: {}", report.substitutions);
    println!(
        "   KiBot:  {:.1}s",
        report.build.duration_ms as f64 / 1000.0
    );
    println!(
        "   Render: {:.1}s -> {}",
        report.render.duration_ms as f64 / 1000.0,
        report.render_image.display()
    );

    Ok(())
}

/// Hand the home and library directories to the host user and become them
fn fix_ownership(identity: Option<HostIdentity>, config: &mut CiConfig) -> Result<()> {
    let Some(identity) = identity else {
        warn!(
            "HOST_UID and HOST_GID not both set, running as uid {}; output files may not belong to you",
            HostIdentity::current().uid
        );
        return Ok(());
    };

    if !running_as_root() {
        warn!(
            "Not running as root, cannot switch to {}:{}; continuing as uid {}",
            identity.uid,
            identity.gid,
            HostIdentity::current().uid
        );
        return Ok(());
    }

    let fix = OwnershipFix::new(identity, config.ownership.paths());
    let changed = fix.apply()?;
    info!("Updated ownership of {} entries", changed);
    fix.drop_privileges()?;

    let home = config.ownership.home_dir.to_string_lossy().to_string();
    config.env.entry("HOME".to_string()).or_insert(home);
    Ok(())
}
