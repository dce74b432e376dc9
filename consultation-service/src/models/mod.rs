//! Domain models for the consultation service.

pub mod consultation;

pub use consultation::{Consultation, NewConsultation, DEFAULT_PATIENT_NAME};
