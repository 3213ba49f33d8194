//! Due-job polling, claiming, and dispatch onto a bounded worker pool.
//!
//! Grounded on the teacher's `fc-scheduler::poller::PendingJobPoller`:
//! same poll-then-dispatch shape, the same `metrics::gauge!`/`counter!`
//! instrumentation, and the same "skip what's blocked, dispatch the
//! rest" loop — reworked from message-group blocking + queue publish
//! onto CAS job claim + a local worker pool, since this pipeline has no
//! message queue between the scheduler and its workers.

use std::sync::Arc;

use chrono::Utc;
use nc_config::SchedulerConfig;
use nc_domain::{ExecutionStatus, Job, JobExecution};
use nc_storage::{JobExecutionRepository, JobRepository};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace, warn};

use crate::error::Result;
use crate::next_run::compute_next_run_at;
use crate::runner::JobRunner;

pub struct SchedulerService<R: JobRunner + 'static> {
    config: SchedulerConfig,
    job_repo: Arc<JobRepository>,
    execution_repo: Arc<JobExecutionRepository>,
    runner: Arc<R>,
    semaphore: Arc<Semaphore>,
}

impl<R: JobRunner + 'static> SchedulerService<R> {
    pub fn new(
        config: SchedulerConfig,
        job_repo: Arc<JobRepository>,
        execution_repo: Arc<JobExecutionRepository>,
        runner: Arc<R>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self { config, job_repo, execution_repo, runner, semaphore }
    }

    /// One polling cycle: lists the due-set, attempts to claim each
    /// candidate, and dispatches every successful claim onto the worker
    /// pool. Returns the number of jobs dispatched.
    pub async fn poll_once(&self) -> Result<usize> {
        let now = Utc::now();
        let due = self.job_repo.list_due(self.config.batch_size as i64, now).await?;
        if due.is_empty() {
            trace!("no due jobs");
            return Ok(0);
        }

        debug!(count = due.len(), "found due jobs");
        metrics::gauge!("scheduler.due_jobs").set(due.len() as f64);

        let mut dispatched = 0usize;
        for job in due {
            if !job.depends_on.is_empty() && !self.job_repo.dependencies_satisfied(&job).await? {
                trace!(job_id = %job.id, "dependencies not satisfied, skipping");
                metrics::counter!("scheduler.jobs.dependency_blocked_total").increment(1);
                continue;
            }

            let Some(claimed) = self.job_repo.claim(job.id, now).await? else {
                // Another instance (or another poll cycle) beat us to it.
                continue;
            };

            self.dispatch(claimed).await;
            dispatched += 1;
        }

        Ok(dispatched)
    }

    async fn dispatch(&self, job: Job) {
        let execution_number = match self.execution_repo.next_execution_number(job.id).await {
            Ok(n) => n,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "failed to allocate execution number");
                return;
            }
        };
        let retry_attempt = job.current_retry_count;
        let mut execution = JobExecution::new(job.id, execution_number, retry_attempt);
        if let Err(e) = self.execution_repo.insert(&execution).await {
            error!(job_id = %job.id, error = %e, "failed to insert execution row");
            return;
        }

        metrics::counter!("scheduler.jobs.dispatched_total").increment(1);

        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return,
        };
        let job_repo = self.job_repo.clone();
        let execution_repo = self.execution_repo.clone();
        let runner = self.runner.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let _permit = permit;
            info!(job_id = %job.id, execution_id = %execution.id, "running job");
            let outcome = runner.run(&job, &execution).await;

            execution.items_crawled = outcome.items_crawled;
            execution.items_indexed = outcome.items_indexed;

            if outcome.is_success() {
                execution.complete(ExecutionStatus::Completed);
                if let Err(e) = execution_repo.update(&execution).await {
                    error!(job_id = %job.id, error = %e, "failed to finalize execution");
                }
                match compute_next_run_at(&job, Utc::now()) {
                    Ok(next_run_at) => {
                        if let Err(e) = job_repo.complete_run(job.id, next_run_at).await {
                            error!(job_id = %job.id, error = %e, "failed to mark job completed");
                        }
                    }
                    Err(e) => error!(job_id = %job.id, error = %e, "failed to compute next run"),
                }
                metrics::counter!("scheduler.jobs.completed_total").increment(1);
            } else {
                let failure = outcome.error.expect("checked above");
                warn!(job_id = %job.id, error = %failure.message, "job execution failed");
                execution.fail(failure.message, failure.stack_trace);
                if let Err(e) = execution_repo.update(&execution).await {
                    error!(job_id = %job.id, error = %e, "failed to finalize failed execution");
                }
                let backoff_secs = job.next_backoff_seconds(config.backoff_max_secs);
                let backoff_until = Utc::now() + chrono::Duration::seconds(backoff_secs);
                if let Err(e) = job_repo.fail_run(job.id, backoff_until, job.max_retries).await {
                    error!(job_id = %job.id, error = %e, "failed to record job failure");
                }
                metrics::counter!("scheduler.jobs.failed_total").increment(1);
            }
        });
    }
}
