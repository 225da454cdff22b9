//! Output formatting and styling module.
//!
//! Provides a centralized interface for all terminal output: colored status
//! lines, the progress bar shown while organizing, and renderers for every
//! report the control panel produces.

use crate::file_organizer::{MoveOutcome, OrganizationReport, PlannedMove};
use crate::maintenance::{CommandOutcome, MaintenanceReport, MaintenanceTask, Plan, Platform};
use crate::system_report::{PerformanceSnapshot, SystemInfo, to_gib};
use crate::temp_cleanup::TempCleanupReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Manages all terminal output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for operations
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sysmaint::output::OutputFormatter;
    /// OutputFormatter::success("File organization completed successfully!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a report title underlined with `=`, as used by the snapshot views.
    pub fn title(title: &str) {
        println!("{}", title.bold());
        println!("{}", "=".repeat(30));
    }

    /// Creates and returns a progress bar for file operations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sysmaint::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a summary table with file counts by category.
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Renders the outcome of an organization run.
    pub fn organization_report(report: &OrganizationReport) {
        Self::info(&format!("Organizing files in {}", report.directory.display()));

        if let Some(error) = report.error() {
            Self::error(&format!("Organization aborted: {}", error));
            return;
        }

        if !report.created_directories.is_empty() {
            Self::plain(&format!(
                "Created category folders: {}",
                report.created_directories.join(", ")
            ));
        }

        if report.records.is_empty() {
            Self::plain("No files found to organize.");
        }

        for record in &report.records {
            match &record.outcome {
                MoveOutcome::Moved { replaced: false } => {
                    Self::success(&format!("Moved {} to {}", record.file_name, record.category));
                }
                MoveOutcome::Moved { replaced: true } => {
                    Self::warning(&format!(
                        "Moved {} to {} (replaced an existing file)",
                        record.file_name, record.category
                    ));
                }
                MoveOutcome::Failed { reason } => {
                    Self::error(&format!("Could not move {}: {}", record.file_name, reason));
                }
                MoveOutcome::Duplicated { reason, .. } => {
                    Self::warning(&format!(
                        "{} was copied to {} but is still in place: {}",
                        record.file_name, record.category, reason
                    ));
                }
            }
        }

        for name in &report.excluded {
            Self::plain(&format!("  skipped {} (excluded by filters)", name));
        }

        Self::summary_table(&report.category_counts(), report.moved_count());

        if report.failed_count() > 0 {
            Self::warning(&format!(
                "{} {} could not be organized. Please review errors above.",
                report.failed_count(),
                plural(report.failed_count())
            ));
        } else {
            Self::success("File organization completed successfully!");
        }
    }

    /// Renders a dry-run plan. `sniffed` holds the content-detected MIME type of
    /// each planned file, in the same order.
    pub fn organization_preview(directory: &str, plan: &[PlannedMove], sniffed: &[Option<String>]) {
        Self::dry_run_notice(&format!("Analyzing contents of: {}", directory));

        if plan.is_empty() {
            Self::plain("No files found to organize.");
            return;
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for (planned, mime) in plan.iter().zip(sniffed) {
            let mime_info = mime
                .as_deref()
                .map(|m| format!(" ({})", m))
                .unwrap_or_default();
            Self::plain(&format!(" - {}{}", planned.file_name, mime_info));
            Self::plain(&format!("   → Would move to {}/", planned.category));
            if planned.replaces_existing {
                Self::warning(&format!(
                    "   {}/{} already exists and would be overwritten",
                    planned.category, planned.file_name
                ));
            }
            *counts.entry(planned.category.clone()).or_insert(0) += 1;
        }

        Self::summary_table(&counts, plan.len());
        Self::success("Dry run complete. No files were modified.");
    }

    /// Renders the commands a maintenance task would run.
    pub fn maintenance_plan(task: MaintenanceTask, platform: Platform, plan: &Plan) {
        Self::dry_run_notice(&format!("{} on {} would run:", task, platform));
        for step in &plan.steps {
            Self::plain(&format!("  $ {}", step));
        }
    }

    /// Renders the outcome of a maintenance task.
    pub fn maintenance_report(report: &MaintenanceReport) {
        Self::info(&format!("{} ({})", report.task, report.platform));

        for step in &report.steps {
            match &step.outcome {
                CommandOutcome::Succeeded => Self::success(&step.command),
                CommandOutcome::Failed { code: Some(code) } => {
                    Self::error(&format!("{} exited with status {}", step.command, code));
                }
                CommandOutcome::Failed { code: None } => {
                    Self::error(&format!("{} was terminated by a signal", step.command));
                }
                CommandOutcome::NotLaunched { reason } => {
                    Self::error(&format!("{} could not be started: {}", step.command, reason));
                }
            }
        }

        if report.halted {
            Self::warning("Stopped after the first failing step.");
        }

        if report.is_success() {
            Self::success(&format!("{} completed successfully!", report.task));
        } else {
            Self::warning(&format!("{} finished with errors.", report.task));
        }
    }

    /// Renders a temp cleanup pass.
    pub fn temp_cleanup_report(report: &TempCleanupReport) {
        Self::info(&format!("Cleaning temporary files in {}", report.directory.display()));

        for name in &report.removed {
            Self::plain(&format!("Removed: {}", name));
        }
        for (name, reason) in &report.failures {
            Self::error(&format!("Error removing {}: {}", name, reason));
        }

        Self::success(&format!(
            "Cleanup completed. Removed {} {}.",
            report.removed.len(),
            plural(report.removed.len())
        ));
    }

    /// Renders a performance snapshot.
    pub fn performance_snapshot(snapshot: &PerformanceSnapshot) {
        Self::title("System Performance Report");

        println!("CPU Usage: {:.1}%", snapshot.cpu_percent);

        Self::header("Memory Usage:");
        println!("Total: {:.2} GB", to_gib(snapshot.memory.total));
        println!("Available: {:.2} GB", to_gib(snapshot.memory.available));
        println!("Used: {:.1}%", snapshot.memory.used_percent());

        Self::header("Disk Usage:");
        match &snapshot.disk {
            Some(disk) => {
                println!("Mount: {}", disk.mount_point.display());
                println!("Total: {:.2} GB", to_gib(disk.total));
                println!("Free: {:.2} GB", to_gib(disk.free));
                println!("Used: {:.1}%", disk.used_percent());
            }
            None => Self::warning("No disks reported."),
        }
    }

    /// Renders system information.
    pub fn system_info(info: &SystemInfo) {
        Self::title("System Information");

        println!("Operating System: {} {}", info.os_name, info.os_release);
        println!("Machine: {}", info.machine);
        println!("Processor: {}", info.processor);

        Self::header("Network Information:");
        println!("Hostname: {}", info.hostname);
        match &info.ip_address {
            Ok(ip) => println!("IP Address: {}", ip),
            Err(reason) => Self::warning(&format!("Network Info Error: {}", reason)),
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
