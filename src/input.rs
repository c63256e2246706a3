//! Comma-separated record input.
//!
//! One record per row, parsed with the `csv` crate: quoted fields may contain
//! commas and doubled quotes, blank lines are skipped, and every row must have
//! the same number of fields as the first. Field values still must not contain
//! a wire delimiter (`|`, `;`, line breaks).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ErrorKind, ReaderBuilder, StringRecordsIntoIter};

use crate::batch::Record;
use crate::error::{BatchwireError, Result};

/// Lazily parses records from a reader.
pub struct RecordReader<R> {
    rows: StringRecordsIntoIter<R>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        let rows = ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader)
            .into_records();
        Self { rows }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(e) => return Some(Err(csv_error(e))),
        };
        let line = row.position().map_or(0, |pos| pos.line());

        let fields = row.iter().map(str::to_string).collect();
        Some(Record::new(fields).map_err(|e| match e {
            BatchwireError::InvalidRecord(msg) => {
                BatchwireError::InvalidRecord(format!("line {}: {}", line, msg))
            }
            other => other,
        }))
    }
}

fn csv_error(err: csv::Error) -> BatchwireError {
    let message = err.to_string();
    match err.into_kind() {
        ErrorKind::Io(e) => BatchwireError::Io(e),
        ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => BatchwireError::InvalidRecord(format!(
            "line {}: expected {} fields, found {}",
            pos.map_or(0, |pos| pos.line()),
            expected_len,
            len
        )),
        _ => BatchwireError::InvalidRecord(message),
    }
}

/// Open `path` and read every record in it.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    RecordReader::new(file).collect()
}
