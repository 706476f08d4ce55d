use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::patient::PatientRecord;

use tracing::error;

use super::StorageError;

/// Line-oriented record file: one JSON-encoded `PatientRecord` per line.
#[derive(Debug)]
pub(crate) struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    /// Opens the file at `path`, creating it and its parent directories if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        // Create the parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(&path, e))?;
        }

        // Touch the file so an empty store loads cleanly
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        Ok(RecordFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single record and sync it to disk
    pub fn append(&self, record: &PatientRecord) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;

        write_line(&mut file, &line)
            .and_then(|_| file.sync_data()) // Ensure data is flushed to disk
            .map_err(|e| StorageError::io(&self.path, e))
    }

    /// Read every record in insertion order
    pub fn load(&self) -> Result<Vec<PatientRecord>, StorageError> {
        let file = File::open(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        self.parse(BufReader::new(file))
    }

    fn parse(&self, reader: impl BufRead) -> Result<Vec<PatientRecord>, StorageError> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line.map_err(|e| StorageError::io(&self.path, e))?;

            // Blank lines carry no record
            if line.trim().is_empty() {
                continue;
            }

            let record: PatientRecord =
                serde_json::from_str(&line).map_err(|source| StorageError::CorruptRecord {
                    path: self.path.clone(),
                    line: line_no,
                    source,
                })?;

            if record.id.is_empty() {
                return Err(StorageError::MissingId {
                    path: self.path.clone(),
                    line: line_no,
                });
            }
            if !seen.insert(record.id.clone()) {
                return Err(StorageError::DuplicateId {
                    path: self.path.clone(),
                    line: line_no,
                    id: record.id,
                });
            }
            records.push(record);
        }

        Ok(records)
    }
}

/// A sink whose length can be read and cut back
trait Truncate {
    fn current_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Truncate for File {
    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write one full line, or cut the sink back to where it started.
fn write_line<W: Write + Truncate>(out: &mut W, line: &[u8]) -> io::Result<()> {
    let start = out.current_len()?;

    if let Err(e) = out.write_all(line).and_then(|_| out.flush()) {
        // Drop whatever part of the line made it out
        if let Err(rollback) = out.truncate_to(start) {
            error!(error = %rollback, "failed to roll back partial record");
        }
        return Err(e);
    }
    Ok(())
}
