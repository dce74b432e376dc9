//! Keyword classifier exposed as a diagnosis provider.

use super::{Diagnosis, DiagnosisProvider};
use crate::services::classifier;
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordDiagnosisProvider;

#[async_trait]
impl DiagnosisProvider for KeywordDiagnosisProvider {
    async fn diagnose(&self, symptoms: &str) -> Diagnosis {
        let result = classifier::classify(symptoms);
        tracing::debug!(label = result.label, "Keyword classification");
        Diagnosis::new(result.label, result.advice)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
