//! Baseline threshold evaluation
//!
//! Each check loads the patient's own baseline from the repository and
//! compares the reading against it. A violation produces exactly one call to
//! the configured [`AlertNotifier`]. A failed lookup is an error, never a
//! silent "no alert".

pub mod alert;

pub use alert::{alert_message, AlertNotifier, LogNotifier};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::MedicalError;
use crate::patient::{BloodPressure, NewPatient, PatientRecord};
use crate::storage::PatientRepository;

/// Allowed deviation from baseline before an alert is raised.
///
/// `blood_pressure` is inclusive: a systolic or diastolic offset of at least
/// this many mmHg triggers. `temperature` is exclusive: the deviation must be
/// strictly greater than this many degrees. Temperatures are compared in
/// hundredths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub blood_pressure: u16,
    pub temperature: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            blood_pressure: 1,
            temperature: 1.5,
        }
    }
}

impl Thresholds {
    /// Rejects thresholds under which a missed alert would not mean "within range".
    pub fn validate(&self) -> Result<(), MedicalError> {
        if self.blood_pressure == 0 {
            return Err(MedicalError::InvalidThresholds(
                "blood_pressure must be at least 1".to_string(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(MedicalError::InvalidThresholds(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn blood_pressure_violated(&self, reading: &BloodPressure, baseline: &BloodPressure) -> bool {
        let (high, low) = reading.deviation_from(baseline);
        high >= self.blood_pressure || low >= self.blood_pressure
    }

    pub fn temperature_violated(&self, reading: f64, baseline: f64) -> bool {
        let limit = hundredths(self.temperature).max(0) as u64;
        hundredths(reading).abs_diff(hundredths(baseline)) > limit
    }
}

fn hundredths(degrees: f64) -> i64 {
    (degrees * 100.0).round() as i64
}

/// Result of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Normal,
    AlertSent,
}

impl CheckOutcome {
    pub fn alerted(&self) -> bool {
        matches!(self, CheckOutcome::AlertSent)
    }
}

pub struct MedicalService<R, N> {
    repository: R,
    notifier: N,
    thresholds: Thresholds,
}

impl<R: PatientRepository, N: AlertNotifier> MedicalService<R, N> {
    pub fn new(repository: R, notifier: N) -> Self {
        MedicalService {
            repository,
            notifier,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_thresholds(
        repository: R,
        notifier: N,
        thresholds: Thresholds,
    ) -> Result<Self, MedicalError> {
        thresholds.validate()?;
        Ok(MedicalService {
            repository,
            notifier,
            thresholds,
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Validate and store a new patient, returning the generated id.
    pub fn register_patient(&self, patient: NewPatient) -> Result<String, MedicalError> {
        patient.validate().map_err(MedicalError::InvalidRecord)?;
        Ok(self.repository.add(patient)?)
    }

    pub fn patient(&self, id: &str) -> Result<PatientRecord, MedicalError> {
        self.repository
            .find_by_id(id)?
            .ok_or_else(|| MedicalError::PatientNotFound(id.to_string()))
    }

    pub fn check_blood_pressure(
        &self,
        id: &str,
        reading: BloodPressure,
    ) -> Result<CheckOutcome, MedicalError> {
        let record = self.patient(id)?;
        let baseline = &record.baseline().normal_blood_pressure;

        debug!(
            patient_id = %id,
            systolic = reading.systolic,
            diastolic = reading.diastolic,
            "checking blood pressure"
        );

        if self.thresholds.blood_pressure_violated(&reading, baseline) {
            Ok(self.raise(id))
        } else {
            Ok(CheckOutcome::Normal)
        }
    }

    pub fn check_temperature(&self, id: &str, reading: f64) -> Result<CheckOutcome, MedicalError> {
        if !reading.is_finite() {
            return Err(MedicalError::InvalidReading(format!(
                "temperature must be a finite number, got {}",
                reading
            )));
        }

        let record = self.patient(id)?;
        let baseline = record.baseline().normal_temperature;

        debug!(patient_id = %id, temperature = reading, "checking temperature");

        if self.thresholds.temperature_violated(reading, baseline) {
            Ok(self.raise(id))
        } else {
            Ok(CheckOutcome::Normal)
        }
    }

    fn raise(&self, id: &str) -> CheckOutcome {
        info!(patient_id = %id, "reading outside baseline, sending alert");
        self.notifier.send(&alert_message(id));
        CheckOutcome::AlertSent
    }
}
