//! Configuration module for consultation-service.

use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

const DEFAULT_DATABASE_PATH: &str = "medical.db";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct ConsultationConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub twilio: TwilioConfig,
    pub gemini: GeminiConfig,
    pub diagnosis_mode: DiagnosisMode,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<Secret<String>>,
    /// Sender for outbound messages, e.g. `whatsapp:+14155238886`.
    pub whatsapp_from: Option<String>,
    pub api_base_url: String,
}

impl TwilioConfig {
    /// Both halves of the credential pair are present and non-empty.
    pub fn is_configured(&self) -> bool {
        let sid_ok = self.account_sid.as_deref().is_some_and(|s| !s.is_empty());
        let token_ok = self
            .auth_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty());
        sid_ok && token_ok
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }
}

/// Which classifier answers symptom messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisMode {
    Keyword,
    Remote,
    /// Remote when a Gemini key is configured, keyword otherwise.
    Auto,
}

impl DiagnosisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Remote => "remote",
            Self::Auto => "auto",
        }
    }
}

impl FromStr for DiagnosisMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyword" | "rules" => Ok(Self::Keyword),
            "remote" | "llm" | "gemini" => Ok(Self::Remote),
            "auto" | "" => Ok(Self::Auto),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "DIAGNOSIS_MODE must be one of keyword, remote, auto (got '{}')",
                other
            ))),
        }
    }
}

impl ConsultationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "consultation-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: non_empty_env("OTLP_ENDPOINT"),
            database: DatabaseConfig {
                path: env::var("DATABASE_PATH")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            twilio: TwilioConfig {
                account_sid: non_empty_env("TWILIO_ACCOUNT_SID"),
                auth_token: non_empty_env("TWILIO_AUTH_TOKEN").map(Secret::new),
                whatsapp_from: non_empty_env("TWILIO_WHATSAPP_FROM"),
                api_base_url: env::var("TWILIO_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_TWILIO_API_BASE.to_string()),
            },
            gemini: GeminiConfig {
                api_key: Secret::new(env::var("GEMINI_API_KEY").unwrap_or_default()),
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
                api_base_url: env::var("GEMINI_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
                timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            diagnosis_mode: env::var("DIAGNOSIS_MODE")
                .unwrap_or_default()
                .parse()?,
        })
    }

    /// Resolves `Auto` against the Gemini credentials.
    pub fn effective_diagnosis_mode(&self) -> DiagnosisMode {
        match self.diagnosis_mode {
            DiagnosisMode::Auto if self.gemini.has_api_key() => DiagnosisMode::Remote,
            DiagnosisMode::Auto => DiagnosisMode::Keyword,
            mode => mode,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(mode: DiagnosisMode, api_key: &str) -> ConsultationConfig {
        ConsultationConfig {
            common: core_config::Config::default(),
            service_name: "consultation-service-test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                path: ":memory:".to_string(),
                max_connections: 1,
            },
            twilio: TwilioConfig {
                account_sid: None,
                auth_token: None,
                whatsapp_from: None,
                api_base_url: DEFAULT_TWILIO_API_BASE.to_string(),
            },
            gemini: GeminiConfig {
                api_key: Secret::new(api_key.to_string()),
                model: "gemini-2.0-flash".to_string(),
                api_base_url: DEFAULT_GEMINI_API_BASE.to_string(),
                timeout_secs: 30,
            },
            diagnosis_mode: mode,
        }
    }

    #[test]
    fn test_parse_diagnosis_mode() {
        assert_eq!("keyword".parse::<DiagnosisMode>().unwrap(), DiagnosisMode::Keyword);
        assert_eq!("LLM".parse::<DiagnosisMode>().unwrap(), DiagnosisMode::Remote);
        assert_eq!("".parse::<DiagnosisMode>().unwrap(), DiagnosisMode::Auto);
        assert!("magic".parse::<DiagnosisMode>().is_err());
    }

    #[test]
    fn test_auto_mode_follows_api_key() {
        assert_eq!(
            config_with(DiagnosisMode::Auto, "key").effective_diagnosis_mode(),
            DiagnosisMode::Remote
        );
        assert_eq!(
            config_with(DiagnosisMode::Auto, "").effective_diagnosis_mode(),
            DiagnosisMode::Keyword
        );
        assert_eq!(
            config_with(DiagnosisMode::Keyword, "key").effective_diagnosis_mode(),
            DiagnosisMode::Keyword
        );
    }

    #[test]
    fn test_twilio_requires_both_credentials() {
        let mut twilio = config_with(DiagnosisMode::Auto, "").twilio;
        assert!(!twilio.is_configured());

        twilio.account_sid = Some("AC123".to_string());
        assert!(!twilio.is_configured());

        twilio.auth_token = Some(Secret::new("token".to_string()));
        assert!(twilio.is_configured());
    }
}
