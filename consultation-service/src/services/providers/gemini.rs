//! Gemini diagnosis provider.
//!
//! Sends one `generateContent` request per symptom message and wraps the
//! answer in the disclaimer template. There is no retry: a failed call turns
//! into an apology for the sender.

use super::{Diagnosis, DiagnosisProvider, ProviderError, LLM_DIAGNOSIS_LABEL};
use crate::config::GeminiConfig;
use crate::services::metrics::REMOTE_ERRORS_TOTAL;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Duration;

const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;
/// Keeps answers short enough for a WhatsApp message.
const MAX_OUTPUT_TOKENS: u32 = 200;

pub const DISCLAIMER_PREFIX: &str =
    "⚠️ Disclaimer: I am an AI and cannot provide medical advice. Consult a doctor for health concerns.\n\n";
pub const DISCLAIMER_SUFFIX: &str =
    "\n\nRemember to consult a healthcare professional for diagnosis and treatment.";

/// Gemini diagnosis provider.
pub struct GeminiDiagnosisProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiDiagnosisProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// `generateContent` URL for the configured model. Contains the API key,
    /// so it must not be logged.
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model,
            self.config.api_key.expose_secret()
        )
    }

    /// Send `prompt` and return the first text part of the first candidate.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(ProviderError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse response: {} - body: {}", e, body))
        })?;

        api_response.first_text().ok_or_else(|| {
            ProviderError::MissingContent(format!("Unexpected response structure: {}", body))
        })
    }
}

/// Map a reqwest failure onto the provider error kinds.
fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    // reqwest errors carry the request URL, which embeds the API key
    let err = err.without_url();
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ProviderError::Transport(err.to_string())
    } else if err.is_decode() {
        ProviderError::MalformedResponse(err.to_string())
    } else {
        ProviderError::Unknown(err.to_string())
    }
}

/// Instructional prompt sent to the model.
pub fn build_prompt(symptoms: &str) -> String {
    format!(
        "You are an AI assistant that gives general information about symptoms.\n\
         You are NOT a medical doctor and cannot give medical advice.\n\
         Always include a clear disclaimer stating this at the beginning and end of your response.\n\
         \n\
         Based on the symptoms below, briefly explain in general terms what they might indicate \
         and suggest common next steps (for example rest, hydration, or when to see a doctor).\n\
         Keep the response concise and suitable for a WhatsApp message \
         (under 160 characters if possible, but prioritize clarity).\n\
         \n\
         Symptoms: {}",
        symptoms
    )
}

/// Surround model output with the fixed disclaimer template.
pub fn wrap_with_disclaimer(text: &str) -> String {
    format!("{}{}{}", DISCLAIMER_PREFIX, text, DISCLAIMER_SUFFIX)
}

#[async_trait]
impl DiagnosisProvider for GeminiDiagnosisProvider {
    async fn diagnose(&self, symptoms: &str) -> Diagnosis {
        tracing::info!(model = %self.config.model, "Calling Gemini API for diagnosis");

        match self.generate(&build_prompt(symptoms)).await {
            Ok(text) => Diagnosis::new(LLM_DIAGNOSIS_LABEL, wrap_with_disclaimer(&text)),
            Err(err) => {
                REMOTE_ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                match &err {
                    ProviderError::Transport(detail) => {
                        tracing::error!(error = %detail, "Error connecting to Gemini API")
                    }
                    ProviderError::Timeout(detail) => {
                        tracing::error!(error = %detail, "Gemini API request timed out")
                    }
                    ProviderError::BadStatus { status, body } => {
                        tracing::error!(status = *status, body = %body, "Gemini API returned an error status")
                    }
                    ProviderError::MalformedResponse(detail) => {
                        tracing::error!(error = %detail, "Gemini API response could not be parsed")
                    }
                    ProviderError::MissingContent(detail) => {
                        tracing::error!(error = %detail, "Gemini API response structure unexpected")
                    }
                    ProviderError::Unknown(detail) => {
                        tracing::error!(error = %detail, "Unexpected error during Gemini API call")
                    }
                }
                Diagnosis::from(&err)
            }
        }
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
    }
}
