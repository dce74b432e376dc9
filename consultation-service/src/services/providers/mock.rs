//! Mock provider implementation for testing.

use super::{Diagnosis, DiagnosisProvider, ProviderError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

enum Outcome {
    Diagnosis(Diagnosis),
    Failure(fn() -> ProviderError),
}

/// Returns a canned diagnosis (or a canned failure) and counts calls.
pub struct MockDiagnosisProvider {
    outcome: Outcome,
    call_count: AtomicU64,
}

impl MockDiagnosisProvider {
    pub fn returning(label: &str, text: &str) -> Self {
        Self {
            outcome: Outcome::Diagnosis(Diagnosis::new(label, text)),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn failing(make_error: fn() -> ProviderError) -> Self {
        Self {
            outcome: Outcome::Failure(make_error),
            call_count: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosisProvider for MockDiagnosisProvider {
    async fn diagnose(&self, symptoms: &str) -> Diagnosis {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(symptoms_len = symptoms.len(), "[MOCK] Diagnosis requested");

        match &self.outcome {
            Outcome::Diagnosis(diagnosis) => diagnosis.clone(),
            Outcome::Failure(make_error) => Diagnosis::from(&make_error()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
