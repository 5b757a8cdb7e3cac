//! Roster reader: parses CSV or JSON roster bytes into records.

use std::io::Cursor;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ClasskitError, Result};

use super::{RosterFormat, RosterRecord, RowError, EMAIL_COLUMNS, NAME_COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Single-pass sequence of roster records parsed from one file.
///
/// Whole-file problems (bad encoding, no `email` column, wrong JSON shape)
/// are reported by [`RosterSource::parse`]. Iteration yields one item per
/// data row: `Ok` for a clean row, `Err(RowError)` for a malformed CSV row.
pub struct RosterSource {
    format: RosterFormat,
    inner: Inner,
}

enum Inner {
    Csv(CsvRows),
    Json(std::vec::IntoIter<RosterRecord>),
}

impl RosterSource {
    /// Parse roster bytes in the given format.
    pub fn parse(mut bytes: Vec<u8>, format: RosterFormat) -> Result<Self> {
        if bytes.starts_with(UTF8_BOM) {
            bytes.drain(..UTF8_BOM.len());
        }

        std::str::from_utf8(&bytes).map_err(|e| {
            ClasskitError::MalformedInput(format!("roster is not valid UTF-8: {e}"))
        })?;

        let inner = match format {
            RosterFormat::Csv => Inner::Csv(CsvRows::open(bytes)?),
            RosterFormat::Json => Inner::Json(parse_json(&bytes)?.into_iter()),
        };

        Ok(Self { format, inner })
    }

    /// Read a roster file, detecting the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let format = RosterFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        Self::parse(bytes, format)
    }

    pub fn format(&self) -> RosterFormat {
        self.format
    }
}

impl Iterator for RosterSource {
    type Item = std::result::Result<RosterRecord, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Csv(rows) => rows.next_row(),
            Inner::Json(records) => records.next().map(Ok),
        }
    }
}

struct CsvRows {
    reader: csv::Reader<Cursor<Vec<u8>>>,
    record: csv::StringRecord,
    width: usize,
    email_idx: usize,
    name_idx: Option<usize>,
    done: bool,
    /// Byte offset up to which newlines have been counted.
    scanned: usize,
    newlines: usize,
}

impl CsvRows {
    fn open(bytes: Vec<u8>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(Cursor::new(bytes));

        let headers = reader
            .headers()
            .map_err(|e| ClasskitError::MalformedInput(format!("cannot read roster header: {e}")))?
            .clone();

        if headers.is_empty() {
            return Err(ClasskitError::MalformedInput(
                "roster is empty, expected a header row".into(),
            ));
        }

        let email_idx = find_column(&headers, EMAIL_COLUMNS).ok_or_else(|| {
            ClasskitError::MalformedInput("roster header has no `email` column".into())
        })?;
        let name_idx = find_column(&headers, NAME_COLUMNS);

        Ok(Self {
            reader,
            record: csv::StringRecord::new(),
            width: headers.len(),
            email_idx,
            name_idx,
            done: false,
            scanned: 0,
            newlines: 0,
        })
    }

    fn next_row(&mut self) -> Option<std::result::Result<RosterRecord, RowError>> {
        if self.done {
            return None;
        }

        match self.reader.read_record(&mut self.record) {
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                if e.is_io_error() {
                    self.done = true;
                }
                let line = e.position().map_or(0, |p| self.line_at(p.byte()));
                Some(Err(RowError {
                    line,
                    reason: e.to_string(),
                }))
            }
            Ok(true) => {
                let start = self.record.position().map(|p| p.byte());
                let line = start.map_or(0, |byte| self.line_at(byte));

                if self.record.len() != self.width {
                    return Some(Err(RowError {
                        line,
                        reason: format!(
                            "expected {} fields, found {}",
                            self.width,
                            self.record.len()
                        ),
                    }));
                }

                let email = self.record.get(self.email_idx).unwrap_or_default().trim();
                if email.is_empty() {
                    return Some(Err(RowError {
                        line,
                        reason: "email is empty".into(),
                    }));
                }

                let name = self.name_idx.and_then(|i| self.record.get(i));
                Some(Ok(RosterRecord::new(email, name, line)))
            }
        }
    }

    /// 1-based physical line of the record starting at `byte`.
    ///
    /// The reader may report a record as starting on the `\n` left over from
    /// the previous `\r\n`, so line terminators at `byte` are skipped first.
    fn line_at(&mut self, byte: u64) -> usize {
        let bytes = self.reader.get_ref().get_ref();
        let mut start = usize::try_from(byte).unwrap_or(usize::MAX).min(bytes.len());
        while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
            start += 1;
        }

        if start < self.scanned {
            return count_newlines(&bytes[..start]) + 1;
        }
        self.newlines += count_newlines(&bytes[self.scanned..start]);
        self.scanned = start;
        self.newlines + 1
    }
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|name| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

fn find_field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| {
        obj.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

fn parse_json(bytes: &[u8]) -> Result<Vec<RosterRecord>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ClasskitError::MalformedInput(format!("invalid JSON roster: {e}")))?;

    let items = value.as_array().ok_or_else(|| {
        ClasskitError::MalformedInput("expected a JSON array of student objects".into())
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let position = i + 1;
            let obj = item.as_object().ok_or_else(|| {
                ClasskitError::MalformedInput(format!("element {position} is not an object"))
            })?;

            let email = find_field(obj, EMAIL_COLUMNS)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    ClasskitError::MalformedInput(format!(
                        "element {position} has no `email` string"
                    ))
                })?;

            let name = match find_field(obj, NAME_COLUMNS) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.as_str()),
                Some(_) => {
                    return Err(ClasskitError::MalformedInput(format!(
                        "element {position}: `name` must be a string"
                    )))
                }
            };

            Ok(RosterRecord::new(email, name, position))
        })
        .collect()
}
