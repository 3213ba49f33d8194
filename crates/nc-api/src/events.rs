//! `GET /api/v1/events` (§4.6, §6, L14): Server-Sent Events stream of
//! `PipelineEvent`s for the admin UI.
//!
//! `nc_events::EventBus` is in-process only (`tokio::sync::broadcast`),
//! but job/execution state actually changes in whichever worker binary
//! is running the scheduler loop, not in `nc-api-server` itself. Rather
//! than add a second transport for cross-process event delivery, the API
//! server runs its own `JobChangePoller` that diffs `jobs`/executions
//! state on an interval and republishes the deltas onto its local bus —
//! the same durable-tables-are-truth pattern the scheduler's CAS claims
//! already rely on, just read instead of written.

use crate::auth::Authenticated;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use nc_domain::JobStatus;
use nc_events::{event_stream, EventBus, PipelineEvent};
use nc_storage::JobRepository;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

#[derive(Clone)]
pub struct EventsState {
    pub bus: Arc<EventBus>,
}

#[utoipa::path(
    get, path = "", tag = "events",
    responses((status = 200, description = "text/event-stream of PipelineEvent"))
)]
pub async fn stream_events(
    State(state): State<EventsState>,
    _auth: Authenticated,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    event_stream(state.bus.subscribe())
}

pub fn events_router(state: EventsState) -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(stream_events)).with_state(state)
}

/// Polls `jobs` on an interval and emits `JobStatusChanged` for every row
/// whose status differs from the last poll. Seeds its baseline on the
/// first tick so process startup never replays history as "changes".
pub struct JobChangePoller {
    jobs: Arc<JobRepository>,
    bus: Arc<EventBus>,
    interval: Duration,
    last_seen: HashMap<Uuid, JobStatus>,
}

impl JobChangePoller {
    pub fn new(jobs: Arc<JobRepository>, bus: Arc<EventBus>, interval: Duration) -> Self {
        Self { jobs, bus, interval, last_seen: HashMap::new() }
    }

    /// Runs until the process exits. Intended to be `tokio::spawn`ed once
    /// from `nc-api-server`'s startup.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(error) = self.poll_once().await {
                tracing::warn!(%error, "job change poll failed");
            }
        }
    }

    async fn poll_once(&mut self) -> nc_storage::Result<()> {
        let jobs = self.jobs.list(500, 0).await?;
        let mut seen = HashMap::with_capacity(jobs.len());

        for job in jobs {
            seen.insert(job.id, job.status);
            match self.last_seen.get(&job.id) {
                Some(old) if *old != job.status => {
                    self.bus.publish(PipelineEvent::JobStatusChanged {
                        job_id: job.id,
                        old_status: *old,
                        new_status: job.status,
                        at: chrono::Utc::now(),
                    });
                }
                _ => {}
            }
        }

        self.last_seen = seen;
        Ok(())
    }
}

