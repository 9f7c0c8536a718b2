//! Job repository over Postgres.
//!
//! Claims rely on `FOR UPDATE SKIP LOCKED`: concurrent claimers lock distinct
//! rows and never wait on each other. Dedup compares `JSONB` values, which is
//! structural equality independent of key order.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Job, JobId, canonicalize};
use crate::store::JobStore;

const JOB_COLUMNS: &str = "id, payload, status, attempt_count, worker_id, created_at, started_at, completed_at, last_error";

#[async_trait]
impl JobStore for super::Db {
    async fn insert(&self, payload: &serde_json::Value) -> Result<JobId> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO jobs (id, payload, status, attempt_count, created_at)
             VALUES ($1, $2, 'queued', 0, now())",
        )
        .bind(id)
        .bind(canonicalize(payload))
        .execute(&self.pool)
        .await?;

        debug!(job_id = %id, "job inserted");
        Ok(JobId(id))
    }

    async fn find_duplicate(&self, payload: &serde_json::Value) -> Result<Option<JobId>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM jobs
             WHERE payload = $1 AND status IN ('queued', 'processing')
             LIMIT 1",
        )
        .bind(canonicalize(payload))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| JobId(id)))
    }

    async fn replace(&self, id: JobId, payload: &serde_json::Value) -> Result<JobId> {
        let rows_affected = sqlx::query(
            "UPDATE jobs
             SET payload = $1, status = 'queued', attempt_count = 0, created_at = now(),
                 worker_id = NULL, started_at = NULL, completed_at = NULL, last_error = NULL
             WHERE id = $2",
        )
        .bind(canonicalize(payload))
        .bind(id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("job {id}")));
        }

        debug!(job_id = %id, "job replaced");
        Ok(id)
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.map(JobRow::try_into_job).transpose()
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>> {
        // The subselect locks one queued row, skipping rows another claim
        // already holds; the UPDATE flips it within the same statement.
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "UPDATE jobs
             SET status = 'processing', worker_id = $1, started_at = now(),
                 attempt_count = attempt_count + 1
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'queued'
                 ORDER BY created_at
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::try_into_job).transpose()
    }

    async fn mark_completed(&self, id: JobId, worker_id: &str) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = now()
             WHERE id = $1 AND status = 'processing' AND worker_id = $2",
        )
        .bind(id.0)
        .bind(worker_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn mark_failed(&self, id: JobId, worker_id: &str, error: &str) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE jobs SET status = 'failed', last_error = $1
             WHERE id = $2 AND status = 'processing' AND worker_id = $3",
        )
        .bind(error)
        .bind(id.0)
        .bind(worker_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    payload: serde_json::Value,
    status: String,
    attempt_count: i32,
    worker_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    last_error: Option<String>,
}

impl JobRow {
    fn try_into_job(self) -> Result<Job> {
        Ok(Job {
            id: JobId(self.id),
            payload: self.payload,
            status: self.status.parse()?,
            attempt_count: self.attempt_count.max(0) as u32,
            worker_id: self.worker_id,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            last_error: self.last_error,
        })
    }
}
