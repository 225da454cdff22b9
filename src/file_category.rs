//! Extension-based file classification.
//!
//! A [`CategoryTable`] is an ordered list of named categories, each owning a set
//! of lowercase, dot-prefixed extensions, followed by a catch-all category that
//! receives everything else.
//!
//! # Examples
//!
//! ```
//! use sysmaint::file_category::CategoryTable;
//!
//! let table = CategoryTable::standard();
//! assert_eq!(table.classify("holiday.JPG"), "Images");
//! assert_eq!(table.classify("notes.txt"), "Documents");
//! assert_eq!(table.classify("mystery.xyz"), "Others");
//! ```

use std::collections::BTreeSet;
use std::path::Path;

/// Name of the catch-all category in the standard table.
pub const CATCH_ALL: &str = "Others";

/// The compiled-in categories, in evaluation order.
const STANDARD_CATEGORIES: &[(&str, &[&str])] = &[
    ("Images", &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff"]),
    ("Documents", &[".pdf", ".doc", ".docx", ".txt", ".xls", ".xlsx"]),
    ("Videos", &[".mp4", ".mkv", ".avi", ".mov", ".flv"]),
    ("Audio", &[".mp3", ".wav", ".aac", ".flac"]),
    ("Archives", &[".zip", ".rar", ".tar", ".gz", ".7z"]),
    ("Code", &[".py", ".java", ".cpp", ".js", ".html", ".css"]),
];

/// Errors raised while building a [`CategoryTable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryTableError {
    /// Two categories (or a category and the catch-all) share a name.
    #[error("duplicate category name '{0}'")]
    DuplicateCategory(String),
}

/// A named bucket of file extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: BTreeSet<String>,
}

impl Category {
    /// The category name, also used as its subdirectory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercase, dot-prefixed extensions owned by this category.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }
}

/// Ordered mapping from category name to extension set, ending in a catch-all.
///
/// The table is immutable once built. Lookups walk the categories in insertion
/// order and the first match wins; the catch-all is never matched by extension.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<Category>,
    catch_all: Category,
}

impl CategoryTable {
    /// Creates an empty table whose only category is the catch-all.
    pub fn new(catch_all: &str) -> Self {
        Self {
            categories: Vec::new(),
            catch_all: Category {
                name: catch_all.to_string(),
                extensions: BTreeSet::new(),
            },
        }
    }

    /// The compiled-in table used by the organizer.
    pub fn standard() -> Self {
        let mut table = Self::new(CATCH_ALL);
        for (name, extensions) in STANDARD_CATEGORIES {
            table.categories.push(Category {
                name: (*name).to_string(),
                extensions: extensions.iter().map(|ext| (*ext).to_string()).collect(),
            });
        }
        table
    }

    /// Appends a category before the catch-all.
    ///
    /// Extensions are normalized to lowercase with a leading dot, so `"PNG"` and
    /// `".png"` are equivalent. Extensions repeated across categories are
    /// accepted; the earlier category keeps winning.
    pub fn with_category<I, S>(mut self, name: &str, extensions: I) -> Result<Self, CategoryTableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if name == self.catch_all.name || self.categories.iter().any(|c| c.name == name) {
            return Err(CategoryTableError::DuplicateCategory(name.to_string()));
        }

        let extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();

        self.categories.push(Category {
            name: name.to_string(),
            extensions,
        });
        Ok(self)
    }

    /// All categories in evaluation order, catch-all last.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().chain(std::iter::once(&self.catch_all))
    }

    /// The catch-all category name.
    pub fn catch_all(&self) -> &str {
        &self.catch_all.name
    }

    /// Returns the category name for a file name.
    pub fn classify(&self, file_name: &str) -> &str {
        let extension = extension_of(file_name);
        if extension.is_empty() {
            return &self.catch_all.name;
        }

        self.categories
            .iter()
            .find(|category| category.contains(&extension))
            .map_or(&self.catch_all.name, |category| &category.name)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Extracts the lowercase, dot-prefixed extension of a file name.
///
/// Returns an empty string when the name has no extension. A leading dot alone
/// (`.bashrc`) does not start an extension.
///
/// ```
/// use sysmaint::file_category::extension_of;
///
/// assert_eq!(extension_of("archive.tar.GZ"), ".gz");
/// assert_eq!(extension_of("README"), "");
/// assert_eq!(extension_of(".bashrc"), "");
/// ```
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| normalize_extension(&ext.to_string_lossy()))
        .unwrap_or_default()
}

pub(crate) fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}
