//! Patient records and vital-sign types
//!
//! A patient carries a personal baseline that every reading is compared
//! against. Records are created once and never modified.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Blood pressure in mmHg. Used both as a stored baseline and as a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u16,  // The "high" number
    pub diastolic: u16, // The "low" number
}

impl BloodPressure {
    pub fn new(systolic: u16, diastolic: u16) -> Self {
        BloodPressure { systolic, diastolic }
    }

    /// Absolute per-component difference as `(systolic, diastolic)`.
    pub fn deviation_from(&self, baseline: &BloodPressure) -> (u16, u16) {
        (
            self.systolic.abs_diff(baseline.systolic),
            self.diastolic.abs_diff(baseline.diastolic),
        )
    }
}

/// The patient's own normal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthBaseline {
    pub normal_temperature: f64, // Degrees Celsius
    pub normal_blood_pressure: BloodPressure,
}

impl HealthBaseline {
    pub fn new(normal_temperature: f64, normal_blood_pressure: BloodPressure) -> Self {
        HealthBaseline {
            normal_temperature,
            normal_blood_pressure,
        }
    }
}

/// A patient that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub baseline: HealthBaseline,
}

impl NewPatient {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        birth_date: NaiveDate,
        baseline: HealthBaseline,
    ) -> Self {
        NewPatient {
            first_name: first_name.into(),
            last_name: last_name.into(),
            birth_date,
            baseline,
        }
    }

    /// Checks that the record can be persisted and later evaluated.
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() {
            return Err("first_name must not be empty".to_string());
        }
        if self.last_name.trim().is_empty() {
            return Err("last_name must not be empty".to_string());
        }
        if !self.baseline.normal_temperature.is_finite() {
            return Err(format!(
                "normal_temperature must be a finite number, got {}",
                self.baseline.normal_temperature
            ));
        }
        Ok(())
    }

    pub fn with_id(self, id: impl Into<String>) -> PatientRecord {
        PatientRecord {
            id: id.into(),
            patient: self,
        }
    }
}

/// A stored patient. Serialized as one flat JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    #[serde(flatten)]
    pub patient: NewPatient,
}

impl PatientRecord {
    pub fn baseline(&self) -> &HealthBaseline {
        &self.patient.baseline
    }
}
