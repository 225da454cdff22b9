//! sysmaint - A system maintenance control panel and file organizer
//!
//! This library provides utilities for sorting the top-level files of a
//! directory into category folders by extension, running per-platform
//! maintenance command plans, cleaning stale temporary files, and reporting
//! on system performance and identity. Filtering and cleanup thresholds are
//! configured via TOML settings files.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod maintenance;
pub mod output;
pub mod system_report;
pub mod temp_cleanup;

pub use config::{CompiledFilters, ConfigError, Settings};
pub use file_category::{Category, CategoryTable, extension_of};
pub use file_organizer::{FileOrganizer, MoveOutcome, MoveRecord, OrganizationReport};
pub use maintenance::{CommandRunner, MaintenanceTask, Platform, run_plan};
pub use temp_cleanup::{TempCleaner, TempCleanupReport};

pub use cli::{Cli, Command, run_cli};
