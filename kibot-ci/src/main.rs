//! kibot-ci - containerized CI for KiCad projects
//!
//! Inside the CI image `kibot-ci run <project> <out_dir> [kibot options...]`
//! copies the project to scratch, rewrites 3D model paths, runs KiBot and
//! renders the board. On the host `kibot-ci scan` runs the image for every
//! project it can find.

mod commands;

use clap::Parser;
use clap::error::ErrorKind;
use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "kibot_ci=debug,convenient_kibot=debug"
    } else {
        "kibot_ci=info,convenient_kibot=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    // Usage errors exit with 1, not clap's default 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, config).map(|_| true),
        Commands::Scan(args) => commands::scan::execute(args, config),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            exit_code(e.exit_code())
        }
    }
}
