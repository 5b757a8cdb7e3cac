//! Roster files: the list of students to bring into a course.
//!
//! A roster is either a CSV file with a header row (an `email` column is
//! required, `name` is optional) or a JSON array of `{"email", "name"}`
//! objects. [`RosterSource`] turns the raw bytes into an ordered, single-pass
//! sequence of [`RosterRecord`]s. Problems with the file as a whole are
//! returned from [`RosterSource::parse`]; a malformed individual CSV row is
//! yielded as a [`RowError`] and the rows after it are still read.

pub mod reader;
pub mod writer;

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClasskitError, Result};

pub use reader::RosterSource;
pub use writer::{write_roster_csv, write_students};

/// Header names accepted for the identifier column.
pub(crate) const EMAIL_COLUMNS: &[&str] = &["email", "student_email"];

/// Header names accepted for the display name column.
pub(crate) const NAME_COLUMNS: &[&str] = &["name", "full_name", "display_name"];

/// One student row from a roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    identifier: String,
    display_name: Option<String>,
    source_line: usize,
}

impl RosterRecord {
    pub fn new(identifier: &str, display_name: Option<&str>, source_line: usize) -> Self {
        Self {
            identifier: identifier.trim().to_string(),
            display_name: display_name
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            source_line,
        }
    }

    /// Email address or numeric Google user id.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// 1-based position in the source file.
    pub fn source_line(&self) -> usize {
        self.source_line
    }
}

/// A row that could not be turned into a [`RosterRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl From<RowError> for ClasskitError {
    fn from(e: RowError) -> Self {
        ClasskitError::MalformedInput(e.to_string())
    }
}

/// Supported roster file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    Json,
}

impl RosterFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse().map_err(|_| {
            ClasskitError::MalformedInput(format!(
                "unsupported roster file format: {}",
                path.display()
            ))
        })
    }
}

impl FromStr for RosterFormat {
    type Err = ClasskitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ClasskitError::MalformedInput(format!(
                "unknown roster format '{other}', expected csv or json"
            ))),
        }
    }
}

impl std::fmt::Display for RosterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}
