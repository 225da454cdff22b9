//! Settings loaded from an optional TOML file.
//!
//! Settings are read once at startup and never written back. They cover the
//! filter rules applied while organizing and the age threshold used by the temp
//! file cleanup.
//!
//! Every filter rule looks at a file's name only, never at the directory it
//! sits in, so `keep.log` and `*.part` mean the same thing wherever the target
//! directory lives. Extensions are compared the way the classifier compares
//! them: lowercased, last suffix only.
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["crdownload"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [temp_cleanup]
//! max_age_days = 7
//! ```

use crate::file_category::{extension_of, normalize_extension};
use crate::temp_cleanup::max_age_from_days;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-directory settings file.
pub const LOCAL_CONFIG_FILE: &str = ".sysmaintrc.toml";

/// Globs match a bare file name, so `*` may match a leading dot.
const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested settings file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub filters: FilterRules,

    #[serde(default)]
    pub temp_cleanup: TempCleanupSettings,
}

/// Rules deciding which top-level files the organizer touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files whose name starts with "." are organized. Defaults to true
    /// so that, out of the box, every top-level file is moved.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Names matching these globs are organized even if an exclude rule or the
    /// hidden file switch would skip them.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_enable_hidden_files() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact file names, e.g. ".DS_Store".
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Globs over the file name, e.g. "*.part".
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions with or without the leading dot, any case.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regexes searched in the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Settings for the temporary file cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempCleanupSettings {
    /// Files whose last modification is older than this many days are removed.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
}

fn default_max_age_days() -> u64 {
    7
}

impl Default for TempCleanupSettings {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
        }
    }
}

impl TempCleanupSettings {
    pub fn max_age(&self) -> Duration {
        max_age_from_days(self.max_age_days)
    }
}

impl Settings {
    /// Loads the first settings file found, or the defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, which must exist when given
    /// 2. `.sysmaintrc.toml` in the current directory
    /// 3. `sysmaint/config.toml` in the user's config directory
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let candidates = [
            Some(PathBuf::from(LOCAL_CONFIG_FILE)),
            dirs::config_dir().map(|dir| dir.join("sysmaint").join("config.toml")),
        ];

        match candidates.into_iter().flatten().find(|path| path.is_file()) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parses one settings file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Compiles the filter rules, rejecting invalid globs and regexes.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// One exclusion rule, in the form it is evaluated.
#[derive(Debug, Clone)]
pub enum ExcludeRule {
    Hidden,
    Name(String),
    /// Normalized the way [`extension_of`] reports it, e.g. ".log".
    Extension(String),
    Glob(Pattern),
    Regex(Regex),
}

impl ExcludeRule {
    fn matches(&self, file_name: &str) -> bool {
        match self {
            ExcludeRule::Hidden => file_name.starts_with('.'),
            ExcludeRule::Name(name) => file_name == name,
            ExcludeRule::Extension(ext) => extension_of(file_name) == *ext,
            ExcludeRule::Glob(pattern) => pattern.matches_with(file_name, NAME_MATCH),
            ExcludeRule::Regex(regex) => regex.is_match(file_name),
        }
    }
}

impl fmt::Display for ExcludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcludeRule::Hidden => f.write_str("hidden file"),
            ExcludeRule::Name(name) => write!(f, "name {}", name),
            ExcludeRule::Extension(ext) => write!(f, "extension {}", ext),
            ExcludeRule::Glob(pattern) => write!(f, "pattern {}", pattern),
            ExcludeRule::Regex(regex) => write!(f, "regex {}", regex),
        }
    }
}

/// Filter rules ready to be applied to file names.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    include: Vec<Pattern>,
    exclude: Vec<ExcludeRule>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let mut exclude = Vec::new();

        if !rules.enable_hidden_files {
            exclude.push(ExcludeRule::Hidden);
        }
        exclude.extend(rules.exclude.filenames.iter().cloned().map(ExcludeRule::Name));
        exclude.extend(
            rules
                .exclude
                .extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .filter(|ext| !ext.is_empty())
                .map(ExcludeRule::Extension),
        );
        for pattern in &rules.exclude.patterns {
            exclude.push(ExcludeRule::Glob(compile_glob(pattern)?));
        }
        for pattern in &rules.exclude.regex {
            let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            exclude.push(ExcludeRule::Regex(regex));
        }

        let include = rules
            .include
            .patterns
            .iter()
            .map(|pattern| compile_glob(pattern))
            .collect::<Result<_, _>>()?;

        Ok(Self { include, exclude })
    }

    /// The first rule that keeps `file_name` out of a run, if any.
    pub fn excluded_by(&self, file_name: &str) -> Option<&ExcludeRule> {
        if self
            .include
            .iter()
            .any(|pattern| pattern.matches_with(file_name, NAME_MATCH))
        {
            return None;
        }
        self.exclude.iter().find(|rule| rule.matches(file_name))
    }

    pub fn should_include(&self, file_name: &str) -> bool {
        self.excluded_by(file_name).is_none()
    }
}

fn compile_glob(pattern: &str) -> Result<Pattern, ConfigError> {
    Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlob {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}
