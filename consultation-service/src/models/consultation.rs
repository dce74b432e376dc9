//! Consultation model: one row per inbound WhatsApp message.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder until senders have a way to register a display name.
pub const DEFAULT_PATIENT_NAME: &str = "Unknown";

/// A persisted exchange. Rows are append-only and never mutated.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Consultation {
    pub id: i64,
    pub phone: String,
    pub symptoms: String,
    pub diagnosis: Option<String>,
    pub response: String,
    /// UTC, second resolution, assigned by SQLite.
    pub timestamp: NaiveDateTime,
    pub patient_name: String,
}

/// Fields supplied by the caller when appending a consultation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConsultation {
    pub phone: String,
    pub symptoms: String,
    pub diagnosis: Option<String>,
    pub response: String,
    pub patient_name: String,
}

impl NewConsultation {
    pub fn new(
        phone: impl Into<String>,
        symptoms: impl Into<String>,
        diagnosis: Option<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            phone: phone.into(),
            symptoms: symptoms.into(),
            diagnosis,
            response: response.into(),
            patient_name: DEFAULT_PATIENT_NAME.to_string(),
        }
    }
}

impl Consultation {
    /// One line of the history reply.
    pub fn history_line(&self) -> String {
        format!(
            "[{}] {} - Symptoms: {} → Diagnosis: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.patient_name,
            self.symptoms,
            self.diagnosis.as_deref().unwrap_or("n/a")
        )
    }
}
