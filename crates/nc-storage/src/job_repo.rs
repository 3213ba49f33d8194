//! Job and job-execution repositories.
//!
//! `claim_due` is the one operation the whole scheduler correctness
//! story rests on: it must claim a due job for exactly one caller even
//! when multiple scheduler instances race it, which is why it is a
//! single `UPDATE ... WHERE status = 'scheduled' RETURNING *` rather
//! than a read followed by a write.

use crate::error::{Result, StorageError};
use crate::source_repo::translate_insert_error;
use chrono::{DateTime, Utc};
use nc_domain::{ExecutionStatus, Job, JobExecution, JobStatus, ProcessedEvent};
use sqlx::PgPool;
use uuid::Uuid;

pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            "INSERT INTO jobs (id, source_id, schedule_type, interval_minutes, cron_expression, trigger,
             priority, status, next_run_at, last_run_at, max_retries, retry_backoff_seconds,
             current_retry_count, failure_count, backoff_until, auto_managed, depends_on,
             timeout_seconds, pre_pause_status)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)",
        )
        .bind(job.id)
        .bind(job.source_id)
        .bind(job.schedule_type)
        .bind(job.interval_minutes)
        .bind(&job.cron_expression)
        .bind(sqlx::types::Json(&job.trigger))
        .bind(job.priority)
        .bind(job.status)
        .bind(job.next_run_at)
        .bind(job.last_run_at)
        .bind(job.max_retries)
        .bind(job.retry_backoff_seconds)
        .bind(job.current_retry_count)
        .bind(job.failure_count)
        .bind(job.backoff_until)
        .bind(job.auto_managed)
        .bind(&job.depends_on)
        .bind(job.timeout_seconds)
        .bind(job.pre_pause_status)
        .execute(&self.pool)
        .await
        .map_err(translate_insert_error("Job", "source_id"))?;
        Ok(())
    }

    /// Admin-API edit of a job's schedule/retry configuration. Leaves
    /// `status`, timestamps, and retry counters untouched — those move
    /// only through the CAS-guarded transitions below.
    pub async fn update_config(&self, job: &Job) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET schedule_type = $2, interval_minutes = $3, cron_expression = $4,
             trigger = $5, priority = $6, depends_on = $7, timeout_seconds = $8, max_retries = $9
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(job.schedule_type)
        .bind(job.interval_minutes)
        .bind(&job.cron_expression)
        .bind(sqlx::types::Json(&job.trigger))
        .bind(job.priority)
        .bind(&job.depends_on)
        .bind(job.timeout_seconds)
        .bind(job.max_retries)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Job", job.id.to_string()));
        }
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_source_id(&self, source_id: Uuid) -> Result<Option<Job>> {
        Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE source_id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Admin-API listing: every job, newest-scheduled first, independent
    /// of the `list_due` dispatch query above.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs ORDER BY priority DESC, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT count(*) FROM jobs").fetch_one(&self.pool).await?)
    }

    /// `ListDue`: jobs where `status in {pending, scheduled}`, not
    /// paused, past backoff, and past `next_run_at`, ordered by
    /// priority then age.
    pub async fn list_due(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs
             WHERE status IN ('pending', 'scheduled')
               AND next_run_at IS NOT NULL AND next_run_at <= $1
               AND (backoff_until IS NULL OR backoff_until < $1)
             ORDER BY priority DESC, next_run_at ASC
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Atomically transitions a due job `scheduled -> running`. Returns
    /// `None` if another instance already claimed it (or it's no longer
    /// due) — the caller should just move on to the next candidate.
    pub async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = 'running', last_run_at = $2
             WHERE id = $1 AND status = 'scheduled'
               AND next_run_at IS NOT NULL AND next_run_at <= $2
               AND (backoff_until IS NULL OR backoff_until < $2)
             RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Event-triggered jobs whose `trigger.channel_name` matches the
    /// event source that just fired (§4.1 step 6).
    pub async fn find_by_event_channel(&self, channel_name: &str) -> Result<Vec<Job>> {
        Ok(sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs
             WHERE schedule_type = 'event' AND status != 'paused'
               AND trigger ->> 'channel_name' = $1",
        )
        .bind(channel_name)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Dependency gating: every entry in `depends_on` must have a latest
    /// execution with status `completed`.
    pub async fn dependencies_satisfied(&self, job: &Job) -> Result<bool> {
        if job.depends_on.is_empty() {
            return Ok(true);
        }
        let unsatisfied: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM unnest($1::uuid[]) AS dep(id)
             WHERE NOT EXISTS (
                 SELECT 1 FROM job_executions je
                 WHERE je.job_id = dep.id
                 ORDER BY je.execution_number DESC
                 LIMIT 1
             ) OR (
                 SELECT je.status FROM job_executions je
                 WHERE je.job_id = dep.id
                 ORDER BY je.execution_number DESC
                 LIMIT 1
             ) != 'completed'",
        )
        .bind(&job.depends_on)
        .fetch_one(&self.pool)
        .await?;
        Ok(unsatisfied == 0)
    }

    /// Recomputes `next_run_at` from the job's schedule and marks it
    /// `scheduled` again after a successful run.
    pub async fn complete_run(&self, id: Uuid, next_run_at: Option<DateTime<Utc>>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'scheduled', next_run_at = $2, current_retry_count = 0,
             backoff_until = NULL WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(next_run_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::cas_conflict("Job", id.to_string()));
        }
        Ok(())
    }

    /// Records a failed run: increments `failure_count`, computes
    /// `backoff_until`, and returns to `scheduled` unless retries are
    /// exhausted, in which case the job terminates as `failed`.
    pub async fn fail_run(&self, id: Uuid, backoff_until: DateTime<Utc>, max_retries: i32) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET
                failure_count = failure_count + 1,
                current_retry_count = current_retry_count + 1,
                backoff_until = $2,
                status = CASE WHEN current_retry_count + 1 >= $3 THEN 'failed'::job_status ELSE 'scheduled'::job_status END
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(backoff_until)
        .bind(max_retries)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn cancel(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE jobs SET status = 'cancelled' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Job", id.to_string()));
        }
        Ok(())
    }

    /// `ForceRun`: makes the job immediately due regardless of its
    /// current `next_run_at`, without disturbing its schedule type.
    pub async fn force_run(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET next_run_at = now(), status = 'scheduled'
             WHERE id = $1 AND status NOT IN ('running', 'cancelled')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Job", id.to_string()));
        }
        Ok(())
    }

    /// Admin `retry` action: clears backoff/retry-count state and makes
    /// the job immediately due, for a job that failed out after
    /// exhausting `max_retries`.
    pub async fn retry(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'scheduled', next_run_at = now(), current_retry_count = 0,
             backoff_until = NULL WHERE id = $1 AND status IN ('failed', 'cancelled')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Job", id.to_string()));
        }
        Ok(())
    }

    /// Idempotent: pausing an already-paused job is a no-op.
    pub async fn pause(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET pre_pause_status = status, status = 'paused'
             WHERE id = $1 AND status != 'paused'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Idempotent. If the restored `next_run_at` is already in the
    /// past, pushes it to `now + 1 minute` rather than firing a
    /// possibly-long backlog immediately.
    pub async fn resume(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET
                status = COALESCE(pre_pause_status, 'scheduled'),
                pre_pause_status = NULL,
                next_run_at = CASE WHEN next_run_at IS NOT NULL AND next_run_at <= $2
                                    THEN $2 + interval '1 minute'
                                    ELSE next_run_at END
             WHERE id = $1 AND status = 'paused'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Job", id.to_string()));
        }
        Ok(())
    }
}

pub struct JobExecutionRepository {
    pool: PgPool,
}

impl JobExecutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Next execution number for `job_id`, monotonic starting at 1.
    pub async fn next_execution_number(&self, job_id: Uuid) -> Result<i64> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT max(execution_number) FROM job_executions WHERE job_id = $1")
                .bind(job_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    pub async fn insert(&self, execution: &JobExecution) -> Result<()> {
        sqlx::query(
            "INSERT INTO job_executions (id, job_id, execution_number, status, started_at, completed_at,
             items_crawled, items_indexed, retry_attempt, error_message, stack_trace, archived_log)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(execution.id)
        .bind(execution.job_id)
        .bind(execution.execution_number)
        .bind(execution.status)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .bind(execution.items_crawled)
        .bind(execution.items_indexed)
        .bind(execution.retry_attempt)
        .bind(&execution.error_message)
        .bind(&execution.stack_trace)
        .bind(execution.archived_log.as_ref().map(sqlx::types::Json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update(&self, execution: &JobExecution) -> Result<()> {
        sqlx::query(
            "UPDATE job_executions SET status = $2, completed_at = $3, items_crawled = $4,
             items_indexed = $5, error_message = $6, stack_trace = $7, archived_log = $8 WHERE id = $1",
        )
        .bind(execution.id)
        .bind(execution.status)
        .bind(execution.completed_at)
        .bind(execution.items_crawled)
        .bind(execution.items_indexed)
        .bind(&execution.error_message)
        .bind(&execution.stack_trace)
        .bind(execution.archived_log.as_ref().map(sqlx::types::Json))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn latest_for_job(&self, job_id: Uuid) -> Result<Option<JobExecution>> {
        Ok(sqlx::query_as::<_, JobExecution>(
            "SELECT * FROM job_executions WHERE job_id = $1 ORDER BY execution_number DESC LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_running(&self, id: Uuid) -> Result<Option<JobExecution>> {
        Ok(sqlx::query_as::<_, JobExecution>(
            "SELECT * FROM job_executions WHERE job_id = $1 AND status = 'running' ORDER BY execution_number DESC LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Recovers executions abandoned by a crashed worker: any `running`
    /// execution whose job hasn't heartbeated (via `started_at`) in
    /// `stale_threshold` is failed out so the job can be retried.
    pub async fn find_stale_running(&self, stale_before: DateTime<Utc>) -> Result<Vec<JobExecution>> {
        Ok(sqlx::query_as::<_, JobExecution>(
            "SELECT * FROM job_executions WHERE status = 'running' AND started_at < $1",
        )
        .bind(stale_before)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_for_job(&self, job_id: Uuid, limit: i64, offset: i64) -> Result<Vec<JobExecution>> {
        Ok(sqlx::query_as::<_, JobExecution>(
            "SELECT * FROM job_executions WHERE job_id = $1 ORDER BY execution_number DESC LIMIT $2 OFFSET $3",
        )
        .bind(job_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_for_job(&self, job_id: Uuid) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT count(*) FROM job_executions WHERE job_id = $1")
                .bind(job_id)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

/// At-least-once event idempotency ledger.
pub struct ProcessedEventRepository {
    pool: PgPool,
}

impl ProcessedEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns `true` if `id` had not already been processed (and is now
    /// recorded), `false` if it's a duplicate delivery.
    pub async fn try_mark_processed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO processed_events (id, processed_at) VALUES ($1, now()) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn prune_older_than(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM processed_events WHERE processed_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl From<sqlx::types::Json<ProcessedEvent>> for ProcessedEvent {
    fn from(value: sqlx::types::Json<ProcessedEvent>) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_status_terminal_matches_domain_definition() {
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
    }
}
