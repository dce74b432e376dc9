#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use consultation_service::config::{
    ConsultationConfig, DatabaseConfig, DiagnosisMode, GeminiConfig, TwilioConfig,
};
use consultation_service::services::ConsultationDb;
use consultation_service::{router, AppState};
use secrecy::Secret;
use service_core::config::Config;
use std::sync::Once;
use tower::ServiceExt;

pub const TEST_PHONE: &str = "whatsapp:+15550001111";

static TRACING: Once = Once::new();

/// Route test logs through `RUST_LOG` once per test binary.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Keyword-mode config on a private in-memory database, no Twilio credentials.
pub fn test_config() -> ConsultationConfig {
    ConsultationConfig {
        common: Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
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
            api_base_url: "http://127.0.0.1:1".to_string(),
        },
        gemini: GeminiConfig {
            api_key: Secret::new(String::new()),
            model: "gemini-2.0-flash".to_string(),
            api_base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
        },
        diagnosis_mode: DiagnosisMode::Keyword,
    }
}

/// Config pointing the Gemini client at `base_url` in remote mode.
pub fn remote_config(base_url: &str) -> ConsultationConfig {
    let mut config = test_config();
    config.gemini.api_key = Secret::new("test-key".to_string());
    config.gemini.api_base_url = base_url.to_string();
    config.diagnosis_mode = DiagnosisMode::Remote;
    config
}

pub struct TestApp {
    pub router: Router,
    pub db: ConsultationDb,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    /// Build the router around a migrated in-memory database.
    pub async fn spawn_with(config: ConsultationConfig) -> Self {
        init_test_tracing();

        let db = ConsultationDb::connect(&config.database.path, config.database.max_connections)
            .await
            .expect("Failed to open test database");
        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        Self::with_db(config, db)
    }

    /// Build the router around `db` as-is, without migrating it.
    pub fn with_db(config: ConsultationConfig, db: ConsultationDb) -> Self {
        let state = AppState::new(config, db.clone()).expect("Failed to build app state");
        TestApp {
            router: router(state),
            db,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, String) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// POST a Twilio-style form to the webhook.
    pub async fn post_message(&self, fields: &[(&str, &str)]) -> (StatusCode, HeaderMap, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/whatsapp")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form_body(fields)))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn send_text(&self, from: &str, body: &str) -> String {
        let (status, _, xml) = self.post_message(&[("From", from), ("Body", body)]).await;
        assert_eq!(status, StatusCode::OK);
        xml
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = String::from_utf8(bytes.to_vec()).expect("Body was not UTF-8");
        (status, headers, body)
    }
}

/// `application/x-www-form-urlencoded` encoding of `fields`.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).expect("Failed to encode form")
}

/// Text between `<Message>` and `</Message>`.
pub fn message_text(xml: &str) -> &str {
    let start = xml.find("<Message>").expect("No <Message> element") + "<Message>".len();
    let end = xml.find("</Message>").expect("No </Message> element");
    &xml[start..end]
}
