//! Recovers executions abandoned by a crashed worker.
//!
//! Grounded on the teacher's `fc-scheduler::stale_recovery::
//! StaleQueuedJobPoller`: same "find stuck rows older than a threshold,
//! reset them, count what you recovered" shape, reworked from
//! QUEUED-status dispatch rows onto `running` job executions.

use std::sync::Arc;

use chrono::Utc;
use nc_config::SchedulerConfig;
use nc_domain::ExecutionStatus;
use nc_storage::{JobExecutionRepository, JobRepository};
use tracing::{debug, info, warn};

use crate::error::Result;

pub struct StaleExecutionRecovery {
    config: SchedulerConfig,
    job_repo: Arc<JobRepository>,
    execution_repo: Arc<JobExecutionRepository>,
}

impl StaleExecutionRecovery {
    pub fn new(config: SchedulerConfig, job_repo: Arc<JobRepository>, execution_repo: Arc<JobExecutionRepository>) -> Self {
        Self { config, job_repo, execution_repo }
    }

    /// Fails out any `running` execution whose job hasn't completed
    /// within `stale_threshold_minutes`, then lets the owning job retry
    /// (or terminate) through the same backoff path a live failure
    /// would take.
    pub async fn recover(&self) -> Result<usize> {
        let threshold = Utc::now() - chrono::Duration::minutes(self.config.stale_threshold_minutes);
        let stale = self.execution_repo.find_stale_running(threshold).await?;

        if stale.is_empty() {
            debug!("no stale executions to recover");
            return Ok(0);
        }

        let count = stale.len();
        warn!(count, threshold_minutes = self.config.stale_threshold_minutes, "recovering stale executions");
        metrics::counter!("scheduler.stale_executions.recovered_total").increment(count as u64);

        for mut execution in stale {
            execution.fail("execution abandoned: no heartbeat within stale threshold".to_string(), None);
            self.execution_repo.update(&execution).await?;

            let backoff_secs = self.config.backoff_initial_secs;
            let backoff_until = Utc::now() + chrono::Duration::seconds(backoff_secs);
            let max_retries = match self.job_repo.find_by_id(execution.job_id).await? {
                Some(job) => job.max_retries,
                None => continue,
            };
            self.job_repo.fail_run(execution.job_id, backoff_until, max_retries).await?;
        }

        info!(count, "stale executions recovered");
        Ok(count)
    }

    pub async fn count_running(&self) -> Result<usize> {
        // There is no single aggregate count operation exposed today;
        // callers that need this reach for `find_stale_running` with a
        // threshold far in the future instead.
        let far_future = Utc::now() + chrono::Duration::days(3650);
        Ok(self.execution_repo.find_stale_running(far_future).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_status_running_is_not_terminal() {
        assert!(!ExecutionStatus::Running.is_terminal());
    }
}
