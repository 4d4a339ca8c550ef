use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use jobscope_core::error::AppError;
use jobscope_core::models::{NormalizedPosting, StoredPosting};
use jobscope_core::traits::{CorpusReader, PostingStore};

/// Repository for job postings in PostgreSQL.
///
/// The `link` column is unique; inserts skip rows whose link is already
/// present, so concurrent runs cannot store the same posting twice.
#[derive(Clone)]
pub struct PostingRepository {
    pool: Pool<Postgres>,
}

impl PostingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recently scraped postings first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<StoredPosting>, AppError> {
        let rows = sqlx::query_as::<_, PostingRow>(
            r#"
            SELECT id, title, company, description, link, scraped_at
            FROM job_postings
            ORDER BY scraped_at DESC, link ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM job_postings"#)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count)
    }

    /// Round-trip to the server; fails with `StorageUnavailable` when it is
    /// unreachable.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct PostingRow {
    id: Uuid,
    title: String,
    company: String,
    description: String,
    link: String,
    scraped_at: DateTime<Utc>,
}

impl From<PostingRow> for StoredPosting {
    fn from(row: PostingRow) -> Self {
        StoredPosting {
            id: row.id,
            title: row.title,
            company: row.company,
            description: row.description,
            link: row.link,
            scraped_at: row.scraped_at,
        }
    }
}

impl PostingStore for PostingRepository {
    async fn exists(&self, link: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) =
            sqlx::query_as(r#"SELECT EXISTS(SELECT 1 FROM job_postings WHERE link = $1)"#)
                .bind(link)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(exists)
    }

    async fn insert_batch(&self, postings: &[NormalizedPosting]) -> Result<u64, AppError> {
        if postings.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut inserted = 0;

        for posting in postings {
            let result = sqlx::query(
                r#"
                INSERT INTO job_postings (title, company, description, link)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (link) DO NOTHING
                "#,
            )
            .bind(&posting.title)
            .bind(&posting.company)
            .bind(&posting.description)
            .bind(&posting.link)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(
            batch = postings.len(),
            inserted,
            "Posting batch committed"
        );
        Ok(inserted)
    }
}

impl CorpusReader for PostingRepository {
    async fn find_all(&self) -> Result<Vec<StoredPosting>, AppError> {
        let rows = sqlx::query_as::<_, PostingRow>(
            r#"
            SELECT id, title, company, description, link, scraped_at
            FROM job_postings
            ORDER BY scraped_at ASC, link ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Connection-class failures mean storage is gone for this run; everything
/// else is an ordinary database error.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> AppError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AppError::StorageUnavailable(error.to_string()),
        other => AppError::DatabaseError(other.to_string()),
    }
}
