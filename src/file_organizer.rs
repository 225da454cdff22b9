//! File organization: moving the top-level files of a directory into one
//! subdirectory per category.
//!
//! A run validates the target directory, creates every category subdirectory,
//! then classifies and moves each top-level regular file. Per-file failures are
//! recorded and the run carries on; only an unusable target directory or a
//! category directory that cannot be created aborts it. Files already sitting in
//! a category subdirectory are never revisited, so repeated runs are idempotent.

use crate::config::CompiledFilters;
use crate::file_category::CategoryTable;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Why a target directory cannot be organized.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Nothing exists at the path.
    #[error("directory not found: {}", .path.display())]
    NotFound { path: PathBuf },
    /// The path exists but is not a directory.
    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },
    /// The directory exists but its metadata or listing cannot be read.
    #[error("cannot access directory {}: {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that abort an organization run.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// The target directory failed its precondition check.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// A category subdirectory could not be created.
    #[error("failed to create category directory {}: {source}", .path.display())]
    CreateCategoryDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A single failed relocation.
#[derive(Debug, thiserror::Error)]
pub enum MoveError {
    /// Nothing was moved; the file is still at `from`.
    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The cross-device copy reached `to`, but `from` could not be deleted
    /// afterwards, so the file now exists in both places.
    #[error("copied {} to {} but could not remove the original: {source}", .from.display(), .to.display())]
    RemoveOriginal {
        from: PathBuf,
        to: PathBuf,
        replaced: bool,
        #[source]
        source: io::Error,
    },
}

impl MoveError {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            MoveError::Move { source, .. } | MoveError::RemoveOriginal { source, .. } => source,
        }
    }
}

/// Outcome of one attempted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The file now lives in its category directory. `replaced` is set when a
    /// same-named file already there was overwritten.
    Moved { replaced: bool },
    /// The move failed; the file was left where it was.
    Failed { reason: String },
    /// The file was copied into its category directory but the original could
    /// not be removed. Both copies exist.
    Duplicated { replaced: bool, reason: String },
}

/// Record of one file processed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub file_name: String,
    pub category: String,
    #[serde(flatten)]
    pub outcome: MoveOutcome,
}

impl MoveRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, MoveOutcome::Moved { .. })
    }

    /// The failure reason, if the move failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            MoveOutcome::Failed { reason } | MoveOutcome::Duplicated { reason, .. } => {
                Some(reason)
            }
            MoveOutcome::Moved { .. } => None,
        }
    }
}

/// Terminal status of a run.
#[derive(Debug)]
pub enum RunStatus {
    /// Every file was attempted. Individual moves may still have failed.
    Completed,
    /// The run stopped before processing files.
    Aborted(OrganizeError),
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RunStatus", 2)?;
        match self {
            RunStatus::Completed => {
                state.serialize_field("state", "completed")?;
                state.serialize_field("reason", &None::<String>)?;
            }
            RunStatus::Aborted(error) => {
                state.serialize_field("state", "aborted")?;
                state.serialize_field("reason", &Some(error.to_string()))?;
            }
        }
        state.end()
    }
}

/// Everything that happened during one organization run.
#[derive(Debug, Serialize)]
pub struct OrganizationReport {
    /// The directory that was organized.
    pub directory: PathBuf,
    /// RFC 3339 timestamp of when the run started.
    pub started_at: String,
    /// RFC 3339 timestamp of when the run finished or aborted.
    pub finished_at: String,
    /// Category directories that did not exist before the run.
    pub created_directories: Vec<String>,
    /// Top-level files skipped by filter rules.
    pub excluded: Vec<String>,
    /// One record per attempted move, in processing order.
    pub records: Vec<MoveRecord>,
    pub status: RunStatus,
}

impl OrganizationReport {
    fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: String::new(),
            created_directories: Vec::new(),
            excluded: Vec::new(),
            records: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    fn finish(mut self, status: RunStatus) -> Self {
        self.finished_at = chrono::Utc::now().to_rfc3339();
        self.status = status;
        self
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted(_))
    }

    /// The error that aborted the run, if any.
    pub fn error(&self) -> Option<&OrganizeError> {
        match &self.status {
            RunStatus::Aborted(error) => Some(error),
            RunStatus::Completed => None,
        }
    }

    pub fn moved_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.records.len() - self.moved_count()
    }

    /// Successful moves per category, sorted by category name.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.is_success()) {
            *counts.entry(record.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// A move that a run would perform, computed without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub file_name: String,
    pub path: PathBuf,
    pub category: String,
    /// A file with the same name already exists in the category directory and
    /// would be overwritten.
    pub replaces_existing: bool,
}

/// Organizes the top-level files of a directory into category subdirectories.
#[derive(Debug, Clone, Default)]
pub struct FileOrganizer {
    table: CategoryTable,
    filters: Option<CompiledFilters>,
}

impl FileOrganizer {
    /// Creates an organizer over the given category table with no filters.
    pub fn new(table: CategoryTable) -> Self {
        Self {
            table,
            filters: None,
        }
    }

    /// Skips files rejected by `filters`.
    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Runs the organizer over `directory`.
    ///
    /// The returned report is aborted when the directory is unusable (nothing
    /// is touched in that case) or when a category directory cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sysmaint::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let report = FileOrganizer::default().organize(Path::new("/home/me/Downloads"));
    /// for record in &report.records {
    ///     println!("{} -> {}", record.file_name, record.category);
    /// }
    /// ```
    pub fn organize(&self, directory: &Path) -> OrganizationReport {
        self.organize_with_progress(directory, |_, _, _| {})
    }

    /// Like [`organize`](Self::organize), calling `on_record(index, total, record)`
    /// after each file is processed.
    pub fn organize_with_progress<F>(&self, directory: &Path, mut on_record: F) -> OrganizationReport
    where
        F: FnMut(usize, usize, &MoveRecord),
    {
        let mut report = OrganizationReport::new(directory);
        info!(directory = %directory.display(), "organizing directory");

        if let Err(e) = validate_directory(directory) {
            warn!(error = %e, "organization aborted before start");
            return report.finish(RunStatus::Aborted(e.into()));
        }

        match self.ensure_category_directories(directory) {
            Ok(created) => report.created_directories = created,
            Err(e) => {
                warn!(error = %e, "organization aborted");
                return report.finish(RunStatus::Aborted(e));
            }
        }

        let (files, excluded) = match self.collect_files(directory) {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "organization aborted");
                return report.finish(RunStatus::Aborted(e.into()));
            }
        };
        report.excluded = excluded;

        let total = files.len();
        for (index, file) in files.into_iter().enumerate() {
            let category = self.table.classify(&file.display_name).to_string();
            let destination = directory.join(&category).join(&file.name);

            let outcome = match move_file(&file.path, &destination) {
                Ok(replaced) => {
                    debug!(file = %file.display_name, category = %category, replaced, "moved file");
                    MoveOutcome::Moved { replaced }
                }
                Err(MoveError::RemoveOriginal {
                    replaced, source, ..
                }) => {
                    warn!(file = %file.display_name, error = %source, "original left behind after copy");
                    MoveOutcome::Duplicated {
                        replaced,
                        reason: format!("copied, but the original could not be removed: {}", source),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "move failed");
                    MoveOutcome::Failed {
                        reason: e.io_error().to_string(),
                    }
                }
            };

            let record = MoveRecord {
                file_name: file.display_name,
                category,
                outcome,
            };
            on_record(index, total, &record);
            report.records.push(record);
        }

        info!(
            moved = report.moved_count(),
            failed = report.failed_count(),
            "organization complete"
        );
        report.finish(RunStatus::Completed)
    }

    /// Computes what [`organize`](Self::organize) would do without mutating
    /// anything. Category directories that do not exist yet are not created.
    pub fn preview(&self, directory: &Path) -> OrganizeResult<Vec<PlannedMove>> {
        validate_directory(directory)?;
        let (files, _) = self.collect_files(directory)?;

        Ok(files
            .into_iter()
            .map(|file| {
                let category = self.table.classify(&file.display_name).to_string();
                let replaces_existing = directory.join(&category).join(&file.name).is_file();
                PlannedMove {
                    file_name: file.display_name,
                    path: file.path,
                    category,
                    replaces_existing,
                }
            })
            .collect())
    }

    /// Creates every category directory that is missing and returns the names
    /// of those it created.
    fn ensure_category_directories(&self, directory: &Path) -> OrganizeResult<Vec<String>> {
        let mut created = Vec::new();

        for category in self.table.categories() {
            let path = directory.join(category.name());
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "created category directory");
                    created.push(category.name().to_string());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
                Err(source) => {
                    return Err(OrganizeError::CreateCategoryDirectory { path, source });
                }
            }
        }

        Ok(created)
    }

    /// Lists the top-level regular files of `directory`, sorted by name, split
    /// into those to process and the names excluded by filters.
    fn collect_files(
        &self,
        directory: &Path,
    ) -> Result<(Vec<TopLevelFile>, Vec<String>), DirectoryError> {
        let entries = fs::read_dir(directory).map_err(|source| DirectoryError::Inaccessible {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        let mut excluded = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                let name = entry.file_name();
                let display_name = name.to_string_lossy().to_string();
                if let Some(filters) = &self.filters
                    && let Some(rule) = filters.excluded_by(&display_name)
                {
                    debug!(file = %display_name, %rule, "excluded by filter");
                    excluded.push(display_name);
                    continue;
                }
                files.push(TopLevelFile {
                    path: entry.path(),
                    name,
                    display_name,
                });
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        excluded.sort();
        Ok((files, excluded))
    }
}

/// A regular file found at the top of the target directory.
struct TopLevelFile {
    path: PathBuf,
    /// The name as stored on disk, used to build the destination.
    name: OsString,
    /// Lossy UTF-8 rendering for classification, records and logs.
    display_name: String,
}

/// Checks that `directory` exists, is a directory and can be listed.
fn validate_directory(directory: &Path) -> Result<(), DirectoryError> {
    let metadata = fs::metadata(directory).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DirectoryError::NotFound {
                path: directory.to_path_buf(),
            }
        } else {
            DirectoryError::Inaccessible {
                path: directory.to_path_buf(),
                source,
            }
        }
    })?;

    if !metadata.is_dir() {
        return Err(DirectoryError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    fs::read_dir(directory)
        .map(|_| ())
        .map_err(|source| DirectoryError::Inaccessible {
            path: directory.to_path_buf(),
            source,
        })
}

/// Moves `from` to `to`, overwriting an existing file at `to`.
///
/// Returns whether an existing file was replaced. A rename across filesystems
/// falls back to copy then remove.
pub fn move_file(from: &Path, to: &Path) -> Result<bool, MoveError> {
    let replaced = to.is_file();

    match fs::rename(from, to) {
        Ok(()) => Ok(replaced),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_then_remove(from, to, replaced, |path| fs::remove_file(path))
        }
        Err(source) => Err(MoveError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }),
    }
}

fn copy_then_remove<R>(from: &Path, to: &Path, replaced: bool, remove: R) -> Result<bool, MoveError>
where
    R: FnOnce(&Path) -> io::Result<()>,
{
    fs::copy(from, to).map_err(|source| MoveError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;

    remove(from).map_err(|source| MoveError::RemoveOriginal {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        replaced,
        source,
    })?;

    Ok(replaced)
}
