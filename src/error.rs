use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by the evaluation service
#[derive(Debug, Error)]
pub enum MedicalError {
    #[error("patient not found: {0}")]
    PatientNotFound(String),

    #[error("invalid patient record: {0}")]
    InvalidRecord(String),

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("invalid reading: {0}")]
    InvalidReading(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
