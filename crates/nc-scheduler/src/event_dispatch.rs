//! Dispatch for `schedule_type = event` jobs (§4.1 step 6).
//!
//! Every inbound event id is checked against the `ProcessedEvent` ledger
//! before dispatch and recorded atomically on success, giving
//! at-least-once delivery from upstream (the router's publish stream,
//! or an external webhook source) idempotent handling here.

use std::sync::Arc;

use nc_storage::{JobRepository, ProcessedEventRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;

pub struct EventDispatcher {
    job_repo: Arc<JobRepository>,
    processed_events: Arc<ProcessedEventRepository>,
}

impl EventDispatcher {
    pub fn new(job_repo: Arc<JobRepository>, processed_events: Arc<ProcessedEventRepository>) -> Self {
        Self { job_repo, processed_events }
    }

    /// Handles one inbound event. `channel_name` is matched against each
    /// event-triggered job's `trigger.channel_name`; a duplicate
    /// `event_id` is silently dropped. Returns the number of jobs forced
    /// to run.
    pub async fn handle_channel_event(&self, event_id: Uuid, channel_name: &str) -> Result<usize> {
        if !self.processed_events.try_mark_processed(event_id).await? {
            debug!(%event_id, channel_name, "duplicate event, skipping");
            return Ok(0);
        }

        let jobs = self.job_repo.find_by_event_channel(channel_name).await?;
        let mut forced = 0;
        for job in jobs {
            match self.job_repo.force_run(job.id).await {
                Ok(()) => {
                    forced += 1;
                    info!(%event_id, job_id = %job.id, channel_name, "forced event-triggered job to run");
                }
                Err(e) => warn!(%event_id, job_id = %job.id, error = %e, "failed to force-run event-triggered job"),
            }
        }
        Ok(forced)
    }
}
