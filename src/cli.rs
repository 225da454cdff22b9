//! Command-line interface module for sysmaint.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Settings loading and filter compilation
//! - Dispatching each control-panel action and rendering its report

use crate::config::Settings;
use crate::file_category::CategoryTable;
use crate::file_organizer::FileOrganizer;
use crate::maintenance::{CommandRunner, MaintenanceTask, SystemCommandRunner, run_plan};
use crate::output::OutputFormatter;
use crate::system_report::{PerformanceSnapshot, SystemInfo};
use crate::temp_cleanup::{TempCleaner, max_age_from_days};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tracing::debug;

/// System maintenance and file organization control panel.
#[derive(Debug, Parser)]
#[command(name = "sysmaint", version, about)]
pub struct Cli {
    /// Settings file to use instead of the default lookup
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// The actions offered by the control panel.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Move the top-level files of a directory into category folders
    Organize {
        /// Directory to organize
        directory: PathBuf,

        /// Show what would be moved without touching anything
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Empty trash, logs and package caches
    DiskCleanup {
        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show CPU, memory and disk usage
    Performance,

    /// Delete old files from the temporary directory
    TempCleanup {
        /// Directory to clean instead of the system temp directory
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,

        /// Age in days after which a file is removed
        #[arg(long, value_name = "DAYS")]
        max_age_days: Option<u64>,
    },

    /// Remove unused packages and stale caches
    PrunePackages {
        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show operating system, hardware and network details
    Info,
}

/// Runs the parsed command line against the real system.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use sysmaint::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["sysmaint", "organize", "/path/to/directory", "--dry-run"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {:#}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Error loading configuration")?;
    debug!(?settings, "settings loaded");

    run_command(&cli.command, &settings, &mut SystemCommandRunner)
}

/// Executes one command with the given settings. Maintenance steps are
/// dispatched through `runner`.
pub fn run_command(
    command: &Command,
    settings: &Settings,
    runner: &mut dyn CommandRunner,
) -> anyhow::Result<()> {
    match command {
        Command::Organize {
            directory,
            dry_run,
            json,
        } => {
            let organizer = build_organizer(settings)?;
            if *dry_run {
                preview_directory(&organizer, directory, *json)
            } else {
                organize_directory(&organizer, directory, *json)
            }
        }
        Command::DiskCleanup { dry_run } => {
            run_maintenance(MaintenanceTask::DiskCleanup, *dry_run, runner)
        }
        Command::PrunePackages { dry_run } => {
            run_maintenance(MaintenanceTask::PackagePrune, *dry_run, runner)
        }
        Command::Performance => {
            OutputFormatter::performance_snapshot(&PerformanceSnapshot::capture());
            Ok(())
        }
        Command::TempCleanup { dir, max_age_days } => {
            let max_age = match max_age_days {
                Some(days) => max_age_from_days(*days),
                None => settings.temp_cleanup.max_age(),
            };
            let cleaner = match dir {
                Some(dir) => TempCleaner::new(dir, max_age),
                None => TempCleaner::system(max_age),
            };
            let report = cleaner.run()?;
            OutputFormatter::temp_cleanup_report(&report);
            Ok(())
        }
        Command::Info => {
            OutputFormatter::system_info(&SystemInfo::collect());
            Ok(())
        }
    }
}

fn build_organizer(settings: &Settings) -> anyhow::Result<FileOrganizer> {
    let filters = settings
        .compile_filters()
        .context("Error compiling filters")?;
    Ok(FileOrganizer::new(CategoryTable::standard()).with_filters(filters))
}

/// Organizes `directory`, showing a progress bar while files are moved.
///
/// Per-file failures are reported but do not fail the command. An aborted run
/// does.
fn organize_directory(organizer: &FileOrganizer, directory: &Path, json: bool) -> anyhow::Result<()> {
    let mut progress: Option<ProgressBar> = None;
    let report = organizer.organize_with_progress(directory, |_, total, record| {
        if json {
            return;
        }
        let pb = progress.get_or_insert_with(|| OutputFormatter::create_progress_bar(total as u64));
        pb.set_message(record.file_name.clone());
        pb.inc(1);
    });
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(error) = report.error() {
        bail!("Organization aborted: {}", error);
    }

    if !json {
        OutputFormatter::organization_report(&report);
    }
    Ok(())
}

fn preview_directory(organizer: &FileOrganizer, directory: &Path, json: bool) -> anyhow::Result<()> {
    let plan = organizer.preview(directory)?;

    if json {
        let entries: Vec<serde_json::Value> = plan
            .iter()
            .map(|planned| {
                serde_json::json!({
                    "file_name": planned.file_name,
                    "category": planned.category,
                    "replaces_existing": planned.replaces_existing,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let sniffed: Vec<Option<String>> = plan
        .iter()
        .map(|planned| {
            infer::get_from_path(&planned.path)
                .ok()
                .flatten()
                .map(|kind| kind.mime_type().to_string())
        })
        .collect();

    OutputFormatter::organization_preview(&directory.display().to_string(), &plan, &sniffed);
    Ok(())
}

fn run_maintenance(
    task: MaintenanceTask,
    dry_run: bool,
    runner: &mut dyn CommandRunner,
) -> anyhow::Result<()> {
    let (platform, plan) = task.current_plan()?;

    if dry_run {
        OutputFormatter::maintenance_plan(task, platform, &plan);
        return Ok(());
    }

    let report = run_plan(runner, task, platform, &plan);
    OutputFormatter::maintenance_report(&report);
    Ok(())
}
