//! Patient record store
//!
//! Handles the durable side of the system:
//! - Appending new patient records to a line-oriented file
//! - Looking records up by their generated id
//! - Detecting corrupt or duplicated entries at load time
//!
//! Records are cached in memory when the store is opened. Edits made to the
//! file by other processes are not visible until [`PatientStore::reload`].

mod persistence;
use persistence::RecordFile;

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::patient::{NewPatient, PatientRecord};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record at {}:{line}: {source}", path.display())]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record without id at {}:{line}", path.display())]
    MissingId { path: PathBuf, line: usize },

    #[error("duplicate record id {id} at {}:{line}", path.display())]
    DuplicateId {
        path: PathBuf,
        line: usize,
        id: String,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("record cache lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Storage operations the evaluation service needs
pub trait PatientRepository {
    /// Persist a new patient and return its generated id.
    fn add(&self, patient: NewPatient) -> Result<String, StorageError>;

    /// Look a patient up by id. `Ok(None)` means no such record.
    fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>, StorageError>;
}

impl<T: PatientRepository + ?Sized> PatientRepository for &T {
    fn add(&self, patient: NewPatient) -> Result<String, StorageError> {
        (**self).add(patient)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>, StorageError> {
        (**self).find_by_id(id)
    }
}

impl<T: PatientRepository + ?Sized> PatientRepository for std::sync::Arc<T> {
    fn add(&self, patient: NewPatient) -> Result<String, StorageError> {
        (**self).add(patient)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>, StorageError> {
        (**self).find_by_id(id)
    }
}

#[derive(Debug)]
pub struct PatientStore {
    file: RecordFile,
    records: RwLock<Vec<PatientRecord>>,
}

impl PatientStore {
    /// Open (or create) the record file at `path` and load every record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let file = RecordFile::open(path)?;
        let records = file.load()?;

        info!(path = %file.path().display(), count = records.len(), "patient store opened");

        Ok(PatientStore {
            file,
            records: RwLock::new(records),
        })
    }

    /// Re-read the backing file. The cache is left untouched if loading fails.
    pub fn reload(&self) -> Result<usize, StorageError> {
        let fresh = self.file.load()?;
        let count = fresh.len();
        *self.write()? = fresh;

        debug!(path = %self.file.path().display(), count, "patient store reloaded");
        Ok(count)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.read()?.is_empty())
    }

    /// Snapshot of all records in insertion order
    pub fn records(&self) -> Result<Vec<PatientRecord>, StorageError> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<PatientRecord>>, StorageError> {
        self.records.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<PatientRecord>>, StorageError> {
        self.records.write().map_err(|_| StorageError::Poisoned)
    }
}

impl PatientRepository for PatientStore {
    fn add(&self, patient: NewPatient) -> Result<String, StorageError> {
        let mut records = self.write()?;

        let mut id = Uuid::new_v4().to_string();
        while records.iter().any(|r| r.id == id) {
            id = Uuid::new_v4().to_string();
        }

        let record = patient.with_id(id.clone());
        self.file.append(&record)?;
        records.push(record);

        info!(patient_id = %id, "patient record added");
        Ok(id)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<PatientRecord>, StorageError> {
        let found = self.read()?.iter().find(|r| r.id == id).cloned();
        debug!(patient_id = %id, found = found.is_some(), "patient lookup");
        Ok(found)
    }
}
