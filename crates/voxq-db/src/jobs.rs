//! PostgreSQL job store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use voxq_core::{
    Error, FieldRef, Job, JobFilter, JobId, JobStatus, JobStore, PageRef, QueueStats, Result,
    SynthesisRequest,
};

use crate::pool::{create_pool, log_pool_metrics, PoolConfig};

const JOB_COLUMNS: &str =
    "id, page_ref, field_ref, request, status, error, created_at, completed_at, claimed_at";

/// PostgreSQL implementation of `JobStore`.
///
/// Every transition is a single conditional `UPDATE`; the `WHERE status = ...`
/// predicate makes `claim` a compare-and-set under row locking.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, run migrations and return the store.
    pub async fn connect(database_url: &str, config: PoolConfig) -> Result<Self> {
        let store = Self::new(create_pool(database_url, config).await?);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Store(format!("migration failed: {e}")))?;
        info!(subsystem = "db", component = "jobs", "Job store migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        let status: String = row.try_get("status")?;
        let Json(request): Json<SynthesisRequest> = row.try_get("request")?;
        Ok(Job {
            id: JobId(row.try_get("id")?),
            page_ref: PageRef(row.try_get("page_ref")?),
            field_ref: FieldRef(row.try_get("field_ref")?),
            request,
            status: status.parse()?,
            error: row.try_get("error")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
            claimed_at: row.try_get("claimed_at")?,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn enqueue(
        &self,
        request: SynthesisRequest,
        page_ref: PageRef,
        field_ref: FieldRef,
    ) -> Result<JobId> {
        request.validate()?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO synthesis_jobs (page_ref, field_ref, request, status, created_at)
             VALUES ($1, $2, $3, 'waiting', $4)
             RETURNING id",
        )
        .bind(page_ref.0)
        .bind(&field_ref.0)
        .bind(Json(&request))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        debug!(subsystem = "db", component = "jobs", op = "enqueue", job_id = id, "Job queued");
        Ok(JobId(id))
    }

    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM synthesis_jobs
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at ASC, id ASC
             LIMIT $2"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::parse_job_row).collect()
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM synthesis_jobs WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn claim(&self, id: JobId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs SET status = 'processing', claimed_at = $2
             WHERE id = $1 AND status = 'waiting'",
        )
        .bind(id.0)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_completed(&self, id: JobId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs SET status = 'completed', completed_at = $2, error = NULL
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_error(&self, id: JobId, message: &str) -> Result<bool> {
        if message.is_empty() {
            return Err(Error::InvalidInput("error message must not be empty".into()));
        }

        let result = sqlx::query(
            "UPDATE synthesis_jobs SET status = 'error', error = $2, completed_at = NULL
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id.0)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reset_to_waiting(&self, id: JobId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs
             SET status = 'waiting', error = NULL, completed_at = NULL, claimed_at = NULL
             WHERE id = $1 AND status IN ('completed', 'error')",
        )
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM synthesis_jobs WHERE id = $1)")
                .bind(id.0)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Ok(false)
        } else {
            Err(Error::JobNotFound(id))
        }
    }

    async fn delete(&self, id: JobId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM synthesis_jobs WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_by_status(&self, status: JobStatus) -> Result<u64> {
        let result = sqlx::query("DELETE FROM synthesis_jobs WHERE status = $1")
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM synthesis_jobs")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM synthesis_jobs WHERE status = 'completed' AND completed_at <= $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<QueueStats> {
        log_pool_metrics(&self.pool);
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM synthesis_jobs GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            let count = count as u64;
            match status.parse::<JobStatus>()? {
                JobStatus::Waiting => stats.waiting = count,
                JobStatus::Processing => stats.processing = count,
                JobStatus::Completed => stats.completed = count,
                JobStatus::Error => stats.error = count,
            }
            stats.total += count;
        }
        Ok(stats)
    }

    async fn requeue_stale_processing(&self, claimed_before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE synthesis_jobs SET status = 'waiting', claimed_at = NULL
             WHERE status = 'processing' AND (claimed_at IS NULL OR claimed_at <= $1)",
        )
        .bind(claimed_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
