//! VitalWatch: per-patient vital-sign monitoring
//!
//! VitalWatch keeps each patient's normal blood pressure and body temperature
//! in a line-oriented record file and raises an alert whenever a new reading
//! strays too far from that patient's own baseline.

pub mod api;
pub mod config;
pub mod error;
pub mod medical;
pub mod patient;
pub mod storage;

pub use error::MedicalError;
pub use medical::{AlertNotifier, CheckOutcome, LogNotifier, MedicalService, Thresholds};
pub use patient::{BloodPressure, HealthBaseline, NewPatient, PatientRecord};
pub use storage::{PatientRepository, PatientStore, StorageError};
