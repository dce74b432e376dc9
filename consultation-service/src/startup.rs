//! Application startup and lifecycle management.

use crate::config::{ConsultationConfig, DiagnosisMode};
use crate::handlers;
use crate::services::providers::{
    DiagnosisProvider, GeminiDiagnosisProvider, KeywordDiagnosisProvider,
};
use crate::services::{ConsultationDb, Responder, TwilioClient};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ConsultationConfig,
    pub db: ConsultationDb,
    pub responder: Responder,
    pub twilio: Option<TwilioClient>,
    pub diagnosis_mode: DiagnosisMode,
}

impl AppState {
    /// Wire the responder and platform client around an open database.
    pub fn new(config: ConsultationConfig, db: ConsultationDb) -> Result<Self, AppError> {
        let diagnosis_mode = config.effective_diagnosis_mode();
        let provider: Arc<dyn DiagnosisProvider> = match diagnosis_mode {
            DiagnosisMode::Remote => {
                if !config.gemini.has_api_key() {
                    tracing::warn!("DIAGNOSIS_MODE=remote without GEMINI_API_KEY; every request will fail");
                }
                tracing::info!(model = %config.gemini.model, "Initialized Gemini diagnosis provider");
                Arc::new(GeminiDiagnosisProvider::new(config.gemini.clone())?)
            }
            DiagnosisMode::Keyword | DiagnosisMode::Auto => {
                tracing::info!("Initialized keyword diagnosis provider");
                Arc::new(KeywordDiagnosisProvider)
            }
        };

        let twilio = TwilioClient::from_config(&config.twilio);
        match &twilio {
            Some(client) => {
                tracing::info!(account_sid = %client.account_sid(), "Twilio client initialized")
            }
            None => tracing::error!(
                "Twilio credentials missing (TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN); platform client disabled"
            ),
        }

        let responder = Responder::new(Arc::new(db.clone()), provider);

        Ok(Self {
            config,
            db,
            responder,
            twilio,
            diagnosis_mode,
        })
    }
}

/// HTTP routes with request id and trace layers applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/whatsapp", post(handlers::whatsapp::webhook))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ConsultationConfig) -> Result<Self, AppError> {
        let db = ConsultationDb::connect(&config.database.path, config.database.max_connections)
            .await
            .map_err(|e| {
                tracing::error!("Failed to open database: {}", e);
                e
            })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

        let state = AppState::new(config.clone(), db)?;

        // Port 0 picks a random port for tests
        let http_addr = format!("{}:{}", config.common.host, config.common.port);
        let http_listener = TcpListener::bind(http_addr.as_str()).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(
            port = http_port,
            diagnosis_mode = state.diagnosis_mode.as_str(),
            "Consultation service listening"
        );

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &ConsultationDb {
        &self.state.db
    }

    /// Serve until SIGINT or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.http_listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
