//! Roster writer: exports rows to CSV or JSON files.

use std::path::Path;

use serde::Serialize;

use crate::error::{ClasskitError, Result};

use super::{RosterFormat, RosterRecord};

/// Write flat rows to `path`, choosing CSV or JSON by the file extension.
///
/// Rows must serialize as flat records when writing CSV.
pub fn write_students<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Err(ClasskitError::Serialization("no rows to write".into()));
    }

    let format = RosterFormat::from_path(path)
        .map_err(|_| ClasskitError::Config(format!("unsupported output format: {}", path.display())))?;

    match format {
        RosterFormat::Csv => write_csv(path, rows.iter()),
        RosterFormat::Json => {
            let json = serde_json::to_string_pretty(rows).map_err(|e| {
                ClasskitError::Serialization(format!("JSON write error for {}: {e}", path.display()))
            })?;
            std::fs::write(path, json)?;
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct RosterCsvRow<'a> {
    email: &'a str,
    name: &'a str,
}

/// Write records as an `email,name` CSV that can be read back as a roster.
pub fn write_roster_csv<'a, I>(path: &Path, records: I) -> Result<()>
where
    I: IntoIterator<Item = &'a RosterRecord>,
{
    write_csv(
        path,
        records.into_iter().map(|r| RosterCsvRow {
            email: r.identifier(),
            name: r.display_name().unwrap_or_default(),
        }),
    )
}

fn write_csv<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).map_err(|e| ClasskitError::Io(std::io::Error::other(e)))?;

    for row in rows {
        wtr.serialize(row).map_err(|e| {
            ClasskitError::Serialization(format!("CSV write error for {}: {e}", path.display()))
        })?;
    }

    wtr.flush()?;
    Ok(())
}
