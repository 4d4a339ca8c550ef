use std::time::Duration;

use jobscope_core::AppError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::posting_repository::{PostingRepository, map_sqlx_error};

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Central database facade: owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL, retrying up to `connect_retries` times.
    ///
    /// Returns `StorageUnavailable` if the server never answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let attempts = config.connect_retries.max(1);
        let mut attempt = 1;

        loop {
            let result = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&config.url)
                .await;

            match result {
                Ok(pool) => {
                    tracing::info!(attempt, "Connected to PostgreSQL");
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let error = map_sqlx_error(e);
                    if attempt >= attempts || !error.halts_persistence() {
                        return Err(error);
                    }
                    tracing::warn!(attempt, attempts, %error, "Database connection failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get a [`PostingRepository`] backed by this pool.
    pub fn posting_repo(&self) -> PostingRepository {
        PostingRepository::new(self.pool.clone())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
