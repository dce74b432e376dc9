//! Inbound WhatsApp webhook.

use crate::startup::AppState;
use crate::utils::twiml::{message_response, TWIML_CONTENT_TYPE};
use axum::{extract::State, http::header, response::IntoResponse, Form};
use serde::Deserialize;

/// Fields Twilio posts for an inbound message. Everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Answer an inbound message with a TwiML reply.
///
/// Always 200: failures inside the responder become apology text.
pub async fn webhook(
    State(state): State<AppState>,
    Form(message): Form<InboundMessage>,
) -> impl IntoResponse {
    let reply = state.responder.handle(&message.from, &message.body).await;
    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], message_response(&reply))
}
