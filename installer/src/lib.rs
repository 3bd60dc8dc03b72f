pub mod config;
pub mod core;
pub mod error;
pub mod install;
pub mod logger;
pub mod models;
pub mod profiles;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::InstallerConfig;
use crate::core::app_dirs;
use crate::core::roots::WellKnownRoots;
use crate::install::worker::{join_install, try_spawn_install, BusyFlag};
use crate::install::InstallPipeline;
use crate::models::{InstallRequest, ProcessVariant};
use crate::profiles::{known_downloads, requirements_text, ProfileCatalog};

pub use crate::error::{ErrorCode, InstallError, InstallResult};
pub use crate::install::progress::{ChannelSink, MemorySink, ProgressSink};
pub use crate::models::{InstallEvent, InstallPhase, InstallReport, TargetProfile};

#[derive(Debug, Parser)]
#[command(name = "reaio", version, about = "Resident Evil Seamless HD Project installer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install the HD project for one game (RE1, RE2 or RE3)
    Install {
        game: String,
        /// Graphics variant; RE1 offers amd and nvidia
        #[arg(long, default_value = "auto")]
        variant: ProcessVariant,
    },
    /// List the supported games and their variants
    List,
    /// Show where the games and mod archives have to be
    HelpRequirements,
    /// Show the mod archives to download and where to get them
    Downloads,
}

/// Entry point of the `reaio` binary.
pub fn run() -> ExitCode {
    logger::init_logger(&app_dirs::get_logs_dir());
    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(code) => code,
        Err(e) => {
            logger::log_error(&format!("{:#}", e), Some("cli"));
            eprintln!("Error: {:#}", e);
            eprintln!("Logs: {}", logger::get_log_folder().display());
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command) -> Result<ExitCode> {
    let config = InstallerConfig::load_default()?;
    let catalog = config.load_catalog()?;

    match command {
        Command::Install { game, variant } => {
            let roots = WellKnownRoots::resolve(&config)?;
            install(InstallPipeline::new(catalog, roots), game, variant)
        }
        Command::List => {
            print_profiles(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Command::HelpRequirements => {
            println!("{}", requirements_text(&catalog));
            Ok(ExitCode::SUCCESS)
        }
        Command::Downloads => {
            for download in known_downloads() {
                println!("{:<24} {}", download.file_name, download.url);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn install(pipeline: InstallPipeline, game: String, variant: ProcessVariant) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the install runtime")?;
    runtime.block_on(install_and_print(pipeline, game, variant))
}

async fn install_and_print(
    pipeline: InstallPipeline,
    game: String,
    variant: ProcessVariant,
) -> Result<ExitCode> {
    let flag = BusyFlag::new();
    let (handle, mut events) = try_spawn_install(
        Arc::new(pipeline),
        InstallRequest::new(game, variant),
        &flag,
    )?;

    while let Some(event) = events.recv().await {
        if event.is_error() {
            eprintln!("{}", event.log_line());
        } else {
            println!("{}", event.log_line());
        }
    }

    // The Failed event already told the user what went wrong.
    match join_install(handle).await {
        Ok(report) => {
            let totals = report.entry_totals();
            if !totals.is_clean() {
                println!(
                    "{} file(s) could not be installed, see the log above",
                    totals.failed
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

fn print_profiles(catalog: &ProfileCatalog) {
    for profile in catalog.iter() {
        let variants: Vec<&str> = profile
            .available_variants()
            .into_iter()
            .map(ProcessVariant::as_str)
            .collect();
        println!(
            "{:<4} {:<32} {:<22} [{}]",
            profile.id,
            profile.folder_name,
            profile.archive_name,
            variants.join(", ")
        );
    }
}
