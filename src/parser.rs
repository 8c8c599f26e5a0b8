// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Delimited log parsing
//!
//! Rows are tokenised with a quote-aware comma reader, trimmed, and handed to
//! a per-format wrangling function. A row that cannot be wrangled becomes a
//! [`RowError`] carrying its line number and raw text; iteration carries on
//! with the next row.

use crate::types::{CommitRecord, Timestamp};
use chrono::{DateTime, NaiveDateTime, Weekday};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Commit timestamp layout once the weekday token has been removed
const COMMIT_DATE_NO_WEEKDAY: &str = "%b %d %H:%M:%S %Y %z";
const COMMIT_DATE_NO_OFFSET: &str = "%b %d %H:%M:%S %Y";

/// Minimum number of fields in a commit row
pub const COMMIT_FIELDS: usize = 4;

/// Why a single row could not be turned into a record
#[derive(Debug, Error)]
pub enum ParseError {
    /// Too few columns
    #[error("expected at least {expected} fields, found {found}")]
    FieldCount {
        /// Minimum number of fields for this log format
        expected: usize,
        /// Fields actually present
        found: usize,
    },

    /// Timestamp column did not match any accepted layout
    #[error("unparseable timestamp {value:?}: {source}")]
    Timestamp {
        /// Trimmed timestamp text
        value: String,
        /// Error from the last layout tried
        source: chrono::ParseError,
    },

    /// A column was not valid UTF-8
    #[error("field {index} is not valid UTF-8")]
    Encoding {
        /// Zero-based column index
        index: usize,
    },
}

/// A skipped row, reported back to the caller
#[derive(Debug, Error)]
#[error("line {line}: {error}")]
pub struct RowError {
    /// One-based line number in the input file
    pub line: u64,
    /// The row as read, columns rejoined with commas
    pub raw: String,
    /// What went wrong
    #[source]
    pub error: ParseError,
}

/// Turns the trimmed columns of one row into a record
pub type Wrangler<T> = fn(Vec<String>) -> Result<T, ParseError>;

/// Lazy, single-pass reader over the rows of a delimited log
///
/// Yields one `Result` per non-empty row. An I/O failure of the underlying
/// reader ends iteration; call [`RowReader::finish`] afterwards to surface it.
pub struct RowReader<R, T> {
    rows: csv::ByteRecordsIntoIter<R>,
    wrangle: Wrangler<T>,
    fatal: Option<csv::Error>,
}

/// Reader over commit log rows
pub type CommitReader<R> = RowReader<R, CommitRecord>;

impl<R: Read, T> RowReader<R, T> {
    /// Wrap any reader; `has_headers` skips the first row
    pub fn new(reader: R, has_headers: bool, wrangle: Wrangler<T>) -> Self {
        let rows = csv::ReaderBuilder::new()
            .has_headers(has_headers)
            .flexible(true)
            .quote(b'"')
            .from_reader(reader)
            .into_byte_records();

        Self {
            rows,
            wrangle,
            fatal: None,
        }
    }

    /// Consume the reader, returning the I/O error that stopped it early, if any
    pub fn finish(self) -> Result<(), csv::Error> {
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<R: Read, T> Iterator for RowReader<R, T> {
    type Item = Result<T, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fatal.is_some() {
            return None;
        }

        match self.rows.next()? {
            Ok(record) => {
                let line = record.position().map_or(0, csv::Position::line);
                let raw = raw_row(&record);
                let wrangled = decode_fields(&record).and_then(self.wrangle);
                Some(wrangled.map_err(|error| RowError { line, raw, error }))
            }
            Err(err) => {
                self.fatal = Some(err);
                None
            }
        }
    }
}

/// Open a commit log for reading
///
/// Only opening the file can fail here; malformed rows surface while iterating.
pub fn open_commit_log(path: &Path, has_headers: bool) -> io::Result<CommitReader<File>> {
    let file = File::open(path)?;
    Ok(RowReader::new(file, has_headers, wrangle_commit))
}

/// Pass records through, logging and collecting every skipped row
pub fn skip_malformed<'a, T, I>(
    rows: I,
    skipped: &'a mut Vec<RowError>,
) -> impl Iterator<Item = T> + 'a
where
    I: Iterator<Item = Result<T, RowError>> + 'a,
    T: 'a,
{
    rows.filter_map(move |row| match row {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(line = err.line, raw = %err.raw, "Skipping row: {}", err.error);
            skipped.push(err);
            None
        }
    })
}

/// Build a commit record from the columns
/// `commit, parents, contributor, timestamp[, extra...]`
pub fn wrangle_commit(fields: Vec<String>) -> Result<CommitRecord, ParseError> {
    if fields.len() < COMMIT_FIELDS {
        return Err(ParseError::FieldCount {
            expected: COMMIT_FIELDS,
            found: fields.len(),
        });
    }

    let mut fields = fields.into_iter();
    let commit_id = fields.next().unwrap_or_default();
    let parent_ids = fields
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(String::from)
        .collect();
    let contributor = fields.next().unwrap_or_default();
    let timestamp_text = fields.next().unwrap_or_default();
    let timestamp = parse_commit_timestamp(&timestamp_text).map_err(|source| {
        ParseError::Timestamp {
            value: timestamp_text.clone(),
            source,
        }
    })?;

    // Messages containing commas overflow into extra columns
    let rest: Vec<String> = fields.collect();
    let extra = if rest.is_empty() {
        None
    } else {
        Some(rest.join(", "))
    };

    Ok(CommitRecord {
        commit_id,
        parent_ids,
        contributor,
        timestamp,
        extra,
    })
}

/// Parse a commit log date such as `Mon Jan 02 15:04:05 2006 -0700`
///
/// The leading weekday is optional and not checked against the date. Without
/// a UTC offset the time is taken as UTC.
pub fn parse_commit_timestamp(value: &str) -> Result<Timestamp, chrono::ParseError> {
    let mut tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens
        .first()
        .is_some_and(|t| t.trim_end_matches(',').parse::<Weekday>().is_ok())
    {
        tokens.remove(0);
    }
    let normalized = tokens.join(" ");

    DateTime::parse_from_str(&normalized, COMMIT_DATE_NO_WEEKDAY).or_else(|err| {
        NaiveDateTime::parse_from_str(&normalized, COMMIT_DATE_NO_OFFSET)
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|_| err)
    })
}

fn decode_fields(record: &csv::ByteRecord) -> Result<Vec<String>, ParseError> {
    record
        .iter()
        .enumerate()
        .map(|(index, field)| {
            std::str::from_utf8(field)
                .map(|s| s.trim().to_string())
                .map_err(|_| ParseError::Encoding { index })
        })
        .collect()
}

fn raw_row(record: &csv::ByteRecord) -> String {
    record
        .iter()
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(",")
}
