//! Diagnosis provider abstractions and implementations.
//!
//! The responder talks to a [`DiagnosisProvider`]; the keyword classifier and
//! the Gemini client are interchangeable behind it.

pub mod gemini;
pub mod keyword;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiDiagnosisProvider;
pub use keyword::KeywordDiagnosisProvider;
pub use mock::MockDiagnosisProvider;

/// Label reported for a successful remote diagnosis.
pub const LLM_DIAGNOSIS_LABEL: &str = "LLM Diagnosis";

/// Label reported for any remote diagnosis failure.
pub const LLM_ERROR_LABEL: &str = "LLM Error";

/// Failure of a remote diagnosis call, tagged by kind.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Valid JSON without a candidate text part.
    #[error("Missing content: {0}")]
    MissingContent(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Short stable name, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::BadStatus { .. } => "bad_status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::MissingContent(_) => "missing_content",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Fixed apology shown to the sender. Never contains error detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transport(_) => {
                "⚠️ AI diagnosis currently unavailable due to a connection issue. Please try again later."
            }
            Self::Timeout(_) => {
                "⚠️ AI diagnosis currently unavailable due to a timeout. Please try again later."
            }
            Self::BadStatus { .. } => {
                "⚠️ AI diagnosis currently unavailable due to a network issue. Please try again later."
            }
            Self::MalformedResponse(_) => {
                "⚠️ AI diagnosis unavailable due to a response formatting issue. Please try again."
            }
            Self::MissingContent(_) => {
                "⚠️ AI diagnosis unavailable. Please try again or consult a doctor."
            }
            Self::Unknown(_) => "⚠️ An unexpected AI error occurred. Please try again.",
        }
    }
}

/// Label plus the advice text that goes into the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub label: String,
    pub text: String,
}

impl Diagnosis {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl From<&ProviderError> for Diagnosis {
    fn from(err: &ProviderError) -> Self {
        Diagnosis::new(LLM_ERROR_LABEL, err.user_message())
    }
}

/// Something that turns a symptom description into a [`Diagnosis`].
///
/// Implementations never fail: errors are logged and folded into the
/// returned diagnosis.
#[async_trait]
pub trait DiagnosisProvider: Send + Sync {
    async fn diagnose(&self, symptoms: &str) -> Diagnosis;

    /// Short name for logs and the readiness endpoint.
    fn name(&self) -> &'static str;
}
