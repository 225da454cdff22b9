//! Removal of stale files from the temporary directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECS_PER_DAY: u64 = 86_400;

/// Converts a day count from settings or the command line to a duration,
/// saturating instead of overflowing.
pub fn max_age_from_days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECS_PER_DAY))
}

#[derive(Debug, thiserror::Error)]
pub enum TempCleanupError {
    #[error("cannot read temp directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TempCleanupReport {
    pub directory: PathBuf,
    /// Names of the files that were removed.
    pub removed: Vec<String>,
    /// Files that looked stale but could not be inspected or removed.
    pub failures: Vec<(String, String)>,
}

/// Deletes regular files older than a threshold from a single directory.
///
/// Subdirectories are left alone, whatever their age.
#[derive(Debug, Clone)]
pub struct TempCleaner {
    directory: PathBuf,
    max_age: Duration,
}

impl TempCleaner {
    pub fn new(directory: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            directory: directory.into(),
            max_age,
        }
    }

    /// A cleaner over the system temp directory.
    pub fn system(max_age: Duration) -> Self {
        Self::new(std::env::temp_dir(), max_age)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Removes stale files using the current time as reference.
    pub fn run(&self) -> Result<TempCleanupReport, TempCleanupError> {
        self.run_at(SystemTime::now())
    }

    /// Removes files whose modification time is more than `max_age` before `now`.
    pub fn run_at(&self, now: SystemTime) -> Result<TempCleanupReport, TempCleanupError> {
        self.run_with(now, |path| fs::remove_file(path))
    }

    fn run_with<R>(&self, now: SystemTime, mut remove: R) -> Result<TempCleanupReport, TempCleanupError>
    where
        R: FnMut(&Path) -> io::Result<()>,
    {
        info!(directory = %self.directory.display(), max_age_secs = self.max_age.as_secs(), "cleaning temp files");

        let entries = fs::read_dir(&self.directory).map_err(|source| TempCleanupError::ReadDir {
            path: self.directory.clone(),
            source,
        })?;

        let mut report = TempCleanupReport {
            directory: self.directory.clone(),
            ..TempCleanupReport::default()
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            match self.remove_if_stale(&entry.path(), now, &mut remove) {
                Ok(true) => {
                    debug!(file = %name, "removed temp file");
                    report.removed.push(name);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(file = %name, error = %e, "could not remove temp file");
                    report.failures.push((name, e.to_string()));
                }
            }
        }

        report.removed.sort();
        report.failures.sort();
        Ok(report)
    }

    fn remove_if_stale<R>(&self, path: &Path, now: SystemTime, remove: &mut R) -> io::Result<bool>
    where
        R: FnMut(&Path) -> io::Result<()>,
    {
        let metadata = fs::symlink_metadata(path)?;
        if !metadata.is_file() {
            return Ok(false);
        }

        // Files stamped in the future are never stale.
        let age = now.duration_since(metadata.modified()?).unwrap_or_default();
        if age <= self.max_age {
            return Ok(false);
        }

        remove(path)?;
        Ok(true)
    }
}
