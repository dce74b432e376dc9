//! Twilio REST client for outbound WhatsApp messages.
//!
//! Inbound replies go back as TwiML in the webhook response; this client is
//! for messages the service initiates itself.

use crate::config::TwilioConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;

/// Twilio API client. Only constructed when credentials are configured.
#[derive(Clone)]
pub struct TwilioClient {
    client: Client,
    account_sid: String,
    auth_token: Secret<String>,
    from: Option<String>,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

impl TwilioClient {
    /// Build a client, or `None` when the account SID or auth token is missing.
    pub fn from_config(config: &TwilioConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }

        Some(Self {
            client: Client::new(),
            account_sid: config.account_sid.clone().unwrap_or_default(),
            auth_token: config
                .auth_token
                .clone()
                .unwrap_or_else(|| Secret::new(String::new())),
            from: config.whatsapp_from.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    /// Send `body` to `to` and return the Twilio message SID.
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String, AppError> {
        let from = self.from.as_deref().ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!(
                "TWILIO_WHATSAPP_FROM is required to send messages"
            ))
        })?;

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| AppError::BadGateway(format!("Failed to reach Twilio: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %error_body, "Twilio API returned error");
            return Err(AppError::BadGateway(format!(
                "Twilio API returned status {}",
                status
            )));
        }

        let message: MessageResource = response
            .json()
            .await
            .map_err(|e| AppError::BadGateway(format!("Failed to parse Twilio response: {}", e)))?;

        tracing::info!(
            to = %to,
            sid = %message.sid,
            status = message.status.as_deref().unwrap_or("unknown"),
            "WhatsApp message sent via Twilio"
        );

        Ok(message.sid)
    }
}
