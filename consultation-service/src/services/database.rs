//! Consultation store backed by SQLite.
//!
//! One flat `consultations` table, append-only. Schema changes ship as
//! versioned sqlx migrations under `migrations/`, applied once at startup.

use crate::models::{Consultation, NewConsultation};
use crate::services::metrics::{DB_ERRORS_TOTAL, DB_QUERY_DURATION};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Default number of rows returned by a history lookup.
pub const DEFAULT_HISTORY_LIMIT: i64 = 3;

/// Persistence boundary used by the responder.
#[async_trait]
pub trait ConsultationStore: Send + Sync {
    /// Insert one row. Failures are logged and reported as `false`.
    async fn append(&self, record: &NewConsultation) -> bool;

    /// Most recent rows for `phone`, newest first. Empty when nothing matches.
    async fn recent(&self, phone: &str, limit: i64) -> Result<Vec<Consultation>, AppError>;
}

/// SQLite connection pool wrapper.
#[derive(Clone)]
pub struct ConsultationDb {
    pool: SqlitePool,
}

impl ConsultationDb {
    /// Open (creating if missing) the database at `path`.
    ///
    /// `:memory:` opens a private in-memory database on a single pinned
    /// connection, since every new in-memory connection is a fresh database.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = if path == ":memory:" {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(30));
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .acquire_timeout(Duration::from_secs(30))
                .connect_with(options)
                .await
        }
        .map_err(|e| {
            error!(error = %e, "Failed to open SQLite database");
            AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e))
        })?;

        info!(max_connections = max_connections, "SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Apply pending migrations. Already-applied versions are skipped.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Insert a consultation and return its id.
    #[instrument(skip(self, record), fields(phone = %record.phone))]
    pub async fn insert(&self, record: &NewConsultation) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_consultation"])
            .start_timer();

        let result = sqlx::query(
            r#"
            INSERT INTO consultations (phone, symptoms, diagnosis, response, patient_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.phone)
        .bind(&record.symptoms)
        .bind(&record.diagnosis)
        .bind(&record.response)
        .bind(&record.patient_name)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert consultation: {}", e)))?;

        timer.observe_duration();

        Ok(result.last_insert_rowid())
    }

    /// Newest-first consultations for `phone`. Rows sharing a timestamp are
    /// ordered by id so later inserts still come first.
    #[instrument(skip(self))]
    pub async fn list_recent(&self, phone: &str, limit: i64) -> Result<Vec<Consultation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_recent"])
            .start_timer();

        let rows = sqlx::query_as::<_, Consultation>(
            r#"
            SELECT id, phone, symptoms, diagnosis, response, timestamp, patient_name
            FROM consultations
            WHERE phone = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(phone)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list consultations: {}", e)))?;

        timer.observe_duration();

        Ok(rows)
    }
}

#[async_trait]
impl ConsultationStore for ConsultationDb {
    async fn append(&self, record: &NewConsultation) -> bool {
        match self.insert(record).await {
            Ok(id) => {
                info!(consultation_id = id, "Saved consultation");
                true
            }
            Err(e) => {
                DB_ERRORS_TOTAL.with_label_values(&["append"]).inc();
                error!(error = ?e, phone = %record.phone, "Database error during save");
                false
            }
        }
    }

    async fn recent(&self, phone: &str, limit: i64) -> Result<Vec<Consultation>, AppError> {
        self.list_recent(phone, limit).await.inspect_err(|e| {
            DB_ERRORS_TOTAL.with_label_values(&["recent"]).inc();
            error!(error = ?e, "History retrieval error");
        })
    }
}
