//! The `JobRunner` this binary hands to `SchedulerService`.
//!
//! A crawl job's execution is not "run the whole pipeline inline" —
//! fetching, extraction, and routing are continuous loops owned by
//! `nc-crawler-worker`/`nc-router-worker` and race none of this. A job
//! run here means "seed the frontier for this source, then wait for the
//! continuous crawl to make observable progress before reporting back",
//! which keeps `JobExecution.items_crawled` meaningful without coupling
//! the scheduler to the fetch pipeline's internals.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nc_domain::{FrontierOrigin, FrontierStatus, FrontierUrl, Job, JobExecution};
use nc_scheduler::{JobRunOutcome, JobRunner};
use nc_storage::{FrontierRepository, SourceRepository};
use tracing::{info, warn};

pub struct SeedingJobRunner {
    sources: Arc<SourceRepository>,
    frontier: Arc<FrontierRepository>,
    progress_poll_interval: Duration,
}

impl SeedingJobRunner {
    pub fn new(sources: Arc<SourceRepository>, frontier: Arc<FrontierRepository>, progress_poll_interval: Duration) -> Self {
        Self { sources, frontier, progress_poll_interval }
    }
}

#[async_trait]
impl JobRunner for SeedingJobRunner {
    async fn run(&self, job: &Job, _execution: &JobExecution) -> JobRunOutcome {
        let source = match self.sources.find_by_id(job.source_id).await {
            Ok(Some(source)) => source,
            Ok(None) => return JobRunOutcome::failure(format!("source {} not found", job.source_id), None),
            Err(error) => return JobRunOutcome::failure(format!("failed to load source: {error}"), None),
        };

        if !source.enabled {
            info!(source_id = %source.id, "source disabled, nothing to seed");
            return JobRunOutcome::success(0, 0);
        }

        let host = match url::Url::parse(&source.seed_url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => host,
            None => return JobRunOutcome::failure(format!("seed_url is not a valid url: {}", source.seed_url), None),
        };

        let seed = FrontierUrl::new(source.seed_url.clone(), host, source.id, FrontierOrigin::Seed, None, 0);
        if let Err(error) = self.frontier.upsert(&seed).await {
            return JobRunOutcome::failure(format!("failed to seed frontier: {error}"), None);
        }

        let baseline = self.frontier.count_by_status(source.id, FrontierStatus::Fetched).await.unwrap_or(0);
        let timeout = Duration::from_secs(job.timeout_seconds.max(30) as u64);
        let deadline = Instant::now() + timeout;
        let mut fetched = baseline;

        while Instant::now() < deadline {
            tokio::time::sleep(self.progress_poll_interval).await;
            match self.frontier.count_by_status(source.id, FrontierStatus::Fetched).await {
                Ok(count) => fetched = count,
                Err(error) => {
                    warn!(source_id = %source.id, error = %error, "failed to poll frontier progress");
                    continue;
                }
            }
            if fetched > baseline {
                break;
            }
        }

        JobRunOutcome::success((fetched - baseline).max(0), 0)
    }
}
