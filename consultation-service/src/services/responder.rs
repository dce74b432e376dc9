//! Inbound message handling.
//!
//! Picks a branch for the message, computes the reply, records the exchange
//! and returns the text to send back. Every failure ends in a reply; nothing
//! is propagated to the webhook layer.

use crate::models::NewConsultation;
use crate::services::database::{ConsultationStore, DEFAULT_HISTORY_LIMIT};
use crate::services::metrics::{DIAGNOSES_TOTAL, MESSAGES_TOTAL};
use crate::services::providers::DiagnosisProvider;
use std::sync::Arc;

pub const EMPTY_BODY_REPLY: &str = "Please describe your symptoms (e.g., 'headache and fever').";
pub const GREETING_REPLY: &str = "👋 Hi! Describe your symptoms (e.g. 'headache and fever')";
pub const NO_HISTORY_REPLY: &str = "No history found for this number.";
pub const HISTORY_ERROR_REPLY: &str = "⚠️ Could not retrieve history due to a database error.";
pub const NOT_SAVED_REPLY: &str =
    "⚠️ System error - your symptoms were not saved. Please try again.";
pub const HISTORY_HEADER: &str = "📜 Your History:";

/// Branch chosen for an inbound message, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Empty,
    Greeting,
    History,
    Symptoms,
}

impl MessageKind {
    /// Classify an already-trimmed message body.
    pub fn of(body: &str) -> Self {
        if body.is_empty() {
            return Self::Empty;
        }
        let lower = body.to_lowercase();
        if lower.contains("hello") {
            Self::Greeting
        } else if lower.contains("history") {
            Self::History
        } else {
            Self::Symptoms
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Greeting => "greeting",
            Self::History => "history",
            Self::Symptoms => "symptoms",
        }
    }
}

/// Reply for the diagnosis branch.
pub fn render_report(symptoms: &str, advice: &str) -> String {
    format!(
        "AI Doctor Report:\n\nSymptoms: {}\nDiagnosis: {}",
        symptoms, advice
    )
}

#[derive(Clone)]
pub struct Responder {
    store: Arc<dyn ConsultationStore>,
    provider: Arc<dyn DiagnosisProvider>,
}

impl Responder {
    pub fn new(store: Arc<dyn ConsultationStore>, provider: Arc<dyn DiagnosisProvider>) -> Self {
        Self { store, provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Handle one inbound message and return the reply text.
    #[tracing::instrument(skip(self, body), fields(branch = tracing::field::Empty))]
    pub async fn handle(&self, phone: &str, body: &str) -> String {
        let body = body.trim();
        let kind = MessageKind::of(body);
        tracing::Span::current().record("branch", kind.as_str());
        MESSAGES_TOTAL.with_label_values(&[kind.as_str()]).inc();

        tracing::info!(content = %body, "Incoming message");

        let (reply, diagnosis) = match kind {
            MessageKind::Empty => (EMPTY_BODY_REPLY.to_string(), None),
            MessageKind::Greeting => (GREETING_REPLY.to_string(), None),
            MessageKind::History => (self.history_reply(phone).await, None),
            MessageKind::Symptoms => {
                let diagnosis = self.provider.diagnose(body).await;
                DIAGNOSES_TOTAL
                    .with_label_values(&[diagnosis.label.as_str()])
                    .inc();
                tracing::info!(label = %diagnosis.label, provider = self.provider.name(), "Diagnosis computed");
                (render_report(body, &diagnosis.text), Some(diagnosis.label))
            }
        };

        let record = NewConsultation::new(phone, body, diagnosis, reply.clone());
        if self.store.append(&record).await {
            reply
        } else {
            NOT_SAVED_REPLY.to_string()
        }
    }

    async fn history_reply(&self, phone: &str) -> String {
        match self.store.recent(phone, DEFAULT_HISTORY_LIMIT).await {
            Ok(rows) if rows.is_empty() => NO_HISTORY_REPLY.to_string(),
            Ok(rows) => {
                let lines: Vec<String> = rows.iter().map(|row| row.history_line()).collect();
                format!("{}\n{}", HISTORY_HEADER, lines.join("\n"))
            }
            Err(_) => HISTORY_ERROR_REPLY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Consultation;
    use crate::services::providers::{MockDiagnosisProvider, ProviderError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use service_core::error::AppError;
    use std::sync::Mutex;

    /// In-memory store that can be told to fail.
    #[derive(Default)]
    struct RecordingStore {
        appended: Mutex<Vec<NewConsultation>>,
        fail_append: bool,
        fail_recent: bool,
    }

    #[async_trait]
    impl ConsultationStore for RecordingStore {
        async fn append(&self, record: &NewConsultation) -> bool {
            if self.fail_append {
                return false;
            }
            self.appended.lock().unwrap().push(record.clone());
            true
        }

        async fn recent(&self, phone: &str, limit: i64) -> Result<Vec<Consultation>, AppError> {
            if self.fail_recent {
                return Err(AppError::DatabaseError(anyhow::anyhow!("disk I/O error")));
            }
            let appended = self.appended.lock().unwrap();
            Ok(appended
                .iter()
                .rev()
                .filter(|r| r.phone == phone)
                .take(limit as usize)
                .enumerate()
                .map(|(i, r)| Consultation {
                    id: i as i64,
                    phone: r.phone.clone(),
                    symptoms: r.symptoms.clone(),
                    diagnosis: r.diagnosis.clone(),
                    response: r.response.clone(),
                    timestamp: NaiveDate::from_ymd_opt(2025, 1, 1)
                        .unwrap()
                        .and_hms_opt(12, 0, 0)
                        .unwrap(),
                    patient_name: r.patient_name.clone(),
                })
                .collect())
        }
    }

    fn responder(store: Arc<RecordingStore>) -> (Responder, Arc<MockDiagnosisProvider>) {
        let provider = Arc::new(MockDiagnosisProvider::returning("flu", "Rest well."));
        (Responder::new(store, provider.clone()), provider)
    }

    #[test]
    fn test_message_kind_priority() {
        assert_eq!(MessageKind::of(""), MessageKind::Empty);
        assert_eq!(MessageKind::of("hello, show my history"), MessageKind::Greeting);
        assert_eq!(MessageKind::of("HISTORY please"), MessageKind::History);
        assert_eq!(MessageKind::of("fever"), MessageKind::Symptoms);
    }

    #[tokio::test]
    async fn test_empty_body_prompts_for_symptoms_and_is_recorded() {
        let store = Arc::new(RecordingStore::default());
        let (responder, provider) = responder(store.clone());

        let reply = responder.handle("whatsapp:+1", "   ").await;

        assert_eq!(reply, EMPTY_BODY_REPLY);
        assert_eq!(provider.call_count(), 0);
        let appended = store.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].symptoms, "");
        assert_eq!(appended[0].diagnosis, None);
    }

    #[tokio::test]
    async fn test_greeting_is_case_insensitive() {
        let store = Arc::new(RecordingStore::default());
        let (responder, provider) = responder(store.clone());

        let upper = responder.handle("whatsapp:+1", "HELLO there").await;
        let lower = responder.handle("whatsapp:+1", "hello there").await;

        assert_eq!(upper, GREETING_REPLY);
        assert_eq!(lower, GREETING_REPLY);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.appended.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_symptoms_produce_report_with_label() {
        let store = Arc::new(RecordingStore::default());
        let (responder, provider) = responder(store.clone());

        let reply = responder.handle("whatsapp:+1", " fever and chills ").await;

        assert_eq!(
            reply,
            "AI Doctor Report:\n\nSymptoms: fever and chills\nDiagnosis: Rest well."
        );
        assert_eq!(provider.call_count(), 1);
        let appended = store.appended.lock().unwrap();
        assert_eq!(appended[0].diagnosis.as_deref(), Some("flu"));
        assert_eq!(appended[0].response, reply);
        assert_eq!(appended[0].patient_name, "Unknown");
    }

    #[tokio::test]
    async fn test_history_lists_previous_consultations() {
        let store = Arc::new(RecordingStore::default());
        let (responder, _) = responder(store.clone());

        responder.handle("whatsapp:+1", "fever and chills").await;
        let reply = responder.handle("whatsapp:+1", "history").await;

        assert!(reply.starts_with(HISTORY_HEADER));
        assert!(reply.contains("Symptoms: fever and chills → Diagnosis: flu"));
    }

    #[tokio::test]
    async fn test_history_without_records() {
        let store = Arc::new(RecordingStore::default());
        let (responder, _) = responder(store);

        assert_eq!(responder.handle("whatsapp:+2", "history").await, NO_HISTORY_REPLY);
    }

    #[tokio::test]
    async fn test_history_store_error_yields_apology() {
        let store = Arc::new(RecordingStore {
            fail_recent: true,
            ..Default::default()
        });
        let (responder, _) = responder(store.clone());

        let reply = responder.handle("whatsapp:+1", "history").await;

        assert_eq!(reply, HISTORY_ERROR_REPLY);
        assert_eq!(store.appended.lock().unwrap()[0].response, HISTORY_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_failed_append_overrides_every_branch() {
        let store = Arc::new(RecordingStore {
            fail_append: true,
            ..Default::default()
        });
        let (responder, _) = responder(store);

        for body in ["", "hello", "history", "fever and chills"] {
            assert_eq!(responder.handle("whatsapp:+1", body).await, NOT_SAVED_REPLY);
        }
    }

    #[tokio::test]
    async fn test_remote_failure_is_reported_as_llm_error() {
        let store = Arc::new(RecordingStore::default());
        let provider = Arc::new(MockDiagnosisProvider::failing(|| {
            ProviderError::Timeout("deadline elapsed".into())
        }));
        let responder = Responder::new(store.clone(), provider.clone());

        let reply = responder.handle("whatsapp:+1", "fever and chills").await;

        assert!(reply.ends_with(
            "⚠️ AI diagnosis currently unavailable due to a timeout. Please try again later."
        ));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            store.appended.lock().unwrap()[0].diagnosis.as_deref(),
            Some("LLM Error")
        );
    }
}
