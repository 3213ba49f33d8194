//! The contract between the scheduler and whatever actually executes a
//! job (the crawler pipeline in `bin/nc-crawler-worker`). The scheduler
//! crate knows nothing about fetching or extraction — it only knows how
//! to claim, time, and retry.

use async_trait::async_trait;
use nc_domain::{Job, JobExecution};

/// Outcome of running a single job execution, reported back to the
/// scheduler so it can finalize the execution row and compute backoff.
pub struct JobRunOutcome {
    pub items_crawled: i64,
    pub items_indexed: i64,
    pub error: Option<JobRunFailure>,
}

impl JobRunOutcome {
    pub fn success(items_crawled: i64, items_indexed: i64) -> Self {
        Self { items_crawled, items_indexed, error: None }
    }

    pub fn failure(message: impl Into<String>, stack_trace: Option<String>) -> Self {
        Self {
            items_crawled: 0,
            items_indexed: 0,
            error: Some(JobRunFailure { message: message.into(), stack_trace }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct JobRunFailure {
    pub message: String,
    pub stack_trace: Option<String>,
}

/// Implemented once per worker binary. `nc-crawler-worker` wires this to
/// the frontier claim loop + extractor; tests can supply a stub.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job, execution: &JobExecution) -> JobRunOutcome;
}
