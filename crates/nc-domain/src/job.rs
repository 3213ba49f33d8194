//! Scheduled crawl jobs and their execution history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a job's next run is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "schedule_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Cron,
    Interval,
    Immediate,
    Event,
}

/// Job lifecycle status.
///
/// Transitions: `pending -> scheduled -> running -> {completed, failed,
/// cancelled}`. `paused` is reachable from any non-terminal state and the
/// job returns to whatever state it was in before pausing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Scheduled,
    Running,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }
}

/// The specific webhook pattern or channel name that fires an
/// `event`-scheduled job. Exactly one of these is set when
/// `schedule_type == Event`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DispatchTrigger {
    pub webhook_pattern: Option<String>,
    pub channel_name: Option<String>,
}

impl DispatchTrigger {
    pub fn is_empty(&self) -> bool {
        self.webhook_pattern.is_none() && self.channel_name.is_none()
    }
}

/// A scheduled crawl. Exactly one job exists per source.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct Job {
    pub id: Uuid,
    pub source_id: Uuid,
    pub schedule_type: ScheduleType,

    pub interval_minutes: Option<i32>,
    pub cron_expression: Option<String>,
    #[sqlx(json)]
    pub trigger: DispatchTrigger,

    /// 0-100, higher runs sooner when multiple jobs are due simultaneously.
    pub priority: i16,
    pub status: JobStatus,

    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,

    pub max_retries: i32,
    pub retry_backoff_seconds: i64,
    pub current_retry_count: i32,
    pub failure_count: i32,
    pub backoff_until: Option<DateTime<Utc>>,

    /// Set when the job's schedule was derived automatically (e.g. from
    /// a legacy cron migration) rather than created explicitly via the
    /// admin API.
    pub auto_managed: bool,

    pub depends_on: Vec<Uuid>,
    pub timeout_seconds: i32,

    /// State the job was in before it was paused, so `resume` can
    /// restore it exactly.
    pub pre_pause_status: Option<JobStatus>,
}

impl Job {
    /// Validates the invariants in §3 that a single struct can check
    /// without consulting the database (uniqueness of `source_id` is
    /// enforced by a storage-level constraint instead).
    pub fn validate(&self) -> Result<(), String> {
        if !(0..=100).contains(&self.priority) {
            return Err(format!("priority {} out of range [0, 100]", self.priority));
        }
        match self.schedule_type {
            ScheduleType::Cron if self.cron_expression.is_none() => {
                return Err("schedule_type=cron requires cron_expression".to_string());
            }
            ScheduleType::Event if self.trigger.is_empty() => {
                return Err("schedule_type=event requires a webhook_pattern or channel_name trigger".to_string());
            }
            ScheduleType::Interval if self.interval_minutes.is_none() => {
                return Err("schedule_type=interval requires interval_minutes".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Scheduled
            && self.next_run_at.map(|t| t <= now).unwrap_or(false)
            && self.backoff_until.map(|t| t <= now).unwrap_or(true)
    }

    pub fn pause(&mut self) {
        if self.status != JobStatus::Paused {
            self.pre_pause_status = Some(self.status);
            self.status = JobStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == JobStatus::Paused {
            self.status = self.pre_pause_status.take().unwrap_or(JobStatus::Scheduled);
        }
    }

    /// Next backoff delay, doubling each consecutive failure and capped
    /// by the caller (`SchedulerConfig::backoff_max_secs`).
    pub fn next_backoff_seconds(&self, cap: i64) -> i64 {
        let exp = self.current_retry_count.min(16) as u32;
        (self.retry_backoff_seconds.max(1) * 2i64.saturating_pow(exp)).min(cap)
    }
}

/// Execution lifecycle status for a single job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "execution_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Pointer to an execution's archived log, once rotated out of the
/// database and into object storage.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ArchivedLog {
    pub object_key: String,
    pub size_bytes: i64,
    pub line_count: i64,
}

/// One run of a job.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct JobExecution {
    pub id: Uuid,
    pub job_id: Uuid,
    /// Monotonic per job, starting at 1.
    pub execution_number: i64,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items_crawled: i64,
    pub items_indexed: i64,
    pub retry_attempt: i32,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
    #[sqlx(json)]
    pub archived_log: Option<ArchivedLog>,
}

impl JobExecution {
    pub fn new(job_id: Uuid, execution_number: i64, retry_attempt: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            execution_number,
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            items_crawled: 0,
            items_indexed: 0,
            retry_attempt,
            error_message: None,
            stack_trace: None,
            archived_log: None,
        }
    }

    /// Milliseconds between `started_at` and `completed_at`. Returns
    /// `None` while the execution is still running.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at.map(|c| nc_common::duration_ms(self.started_at, c))
    }

    pub fn complete(&mut self, status: ExecutionStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error_message: impl Into<String>, stack_trace: Option<String>) {
        self.error_message = Some(error_message.into());
        self.stack_trace = stack_trace;
        self.complete(ExecutionStatus::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            schedule_type: ScheduleType::Interval,
            interval_minutes: Some(60),
            cron_expression: None,
            trigger: DispatchTrigger::default(),
            priority: 50,
            status: JobStatus::Scheduled,
            next_run_at: Some(Utc::now() - chrono::Duration::seconds(1)),
            last_run_at: None,
            max_retries: 3,
            retry_backoff_seconds: 30,
            current_retry_count: 0,
            failure_count: 0,
            backoff_until: None,
            auto_managed: false,
            depends_on: vec![],
            timeout_seconds: 300,
            pre_pause_status: None,
        }
    }

    #[test]
    fn cron_schedule_requires_expression() {
        let mut job = base_job();
        job.schedule_type = ScheduleType::Cron;
        job.cron_expression = None;
        assert!(job.validate().is_err());
        job.cron_expression = Some("0 */6 * * *".to_string());
        assert!(job.validate().is_ok());
    }

    #[test]
    fn priority_out_of_range_is_rejected() {
        let mut job = base_job();
        job.priority = 101;
        assert!(job.validate().is_err());
    }

    #[test]
    fn pause_then_resume_restores_prior_status() {
        let mut job = base_job();
        job.status = JobStatus::Running;
        job.pause();
        assert_eq!(job.status, JobStatus::Paused);
        job.resume();
        assert_eq!(job.status, JobStatus::Running);
    }

    #[test]
    fn is_due_respects_backoff_until() {
        let mut job = base_job();
        job.backoff_until = Some(Utc::now() + chrono::Duration::seconds(60));
        assert!(!job.is_due(Utc::now()));
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let mut job = base_job();
        job.retry_backoff_seconds = 10;
        job.current_retry_count = 0;
        assert_eq!(job.next_backoff_seconds(3600), 10);
        job.current_retry_count = 3;
        assert_eq!(job.next_backoff_seconds(3600), 80);
        job.current_retry_count = 20;
        assert_eq!(job.next_backoff_seconds(3600), 3600);
    }

    #[test]
    fn job_execution_duration_is_none_while_running() {
        let exec = JobExecution::new(Uuid::new_v4(), 1, 0);
        assert!(exec.duration_ms().is_none());
    }

    #[test]
    fn job_execution_fail_sets_terminal_status() {
        let mut exec = JobExecution::new(Uuid::new_v4(), 1, 0);
        exec.fail("boom", None);
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert!(exec.duration_ms().unwrap() >= 0);
    }
}
