use super::*;

use csv::{ByteRecord, ReaderBuilder, Trim, Writer};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not read {}: {source}", .path.display())]
    Read { path: PathBuf, source: csv::Error },
    #[error("could not write {}: {source}", .path.display())]
    Write { path: PathBuf, source: csv::Error },
    #[error("could not flush {}: {source}", .path.display())]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Destination for recorded rows. Rows are only ever appended.
pub trait RowSink {
    fn append(&mut self, row: &TimeSeriesRow) -> Result<(), StoreError>;

    fn flush(&mut self) -> Result<(), StoreError>;
}

/// Append-only CSV file holding one recording.
pub struct CsvStore {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvStore {
    /// Create (or truncate) the file at `path` and write the header.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let file = File::create(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut store = Self {
            path: path.to_path_buf(),
            writer: Writer::from_writer(file),
        };

        store
            .writer
            .write_record(HEADER)
            .map_err(|source| StoreError::Write {
                path: store.path.clone(),
                source,
            })?;
        store.flush()?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for CsvStore {
    fn append(&mut self, row: &TimeSeriesRow) -> Result<(), StoreError> {
        self.writer
            .write_record(row.fields())
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.writer.flush().map_err(|source| StoreError::Flush {
            path: self.path.clone(),
            source,
        })
    }
}

impl RowSink for Vec<TimeSeriesRow> {
    fn append(&mut self, row: &TimeSeriesRow) -> Result<(), StoreError> {
        self.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Read a whole recording. Whitespace around separators and header names is
/// ignored, rows may have fewer fields than the header, and bytes that are
/// not valid UTF-8 are replaced rather than failing the read.
pub fn read_all(path: &Path) -> Result<Recording, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    Recording::from_reader(file).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl Recording {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = text(reader.byte_headers()?);

        let mut rows = Vec::new();
        let mut record = ByteRecord::new();

        while reader.read_byte_record(&mut record)? {
            rows.push(text(&record));
        }

        Ok(Recording::new(columns, rows))
    }
}

fn text(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}
