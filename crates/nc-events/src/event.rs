//! L14: the closed set of domain events the admin UI can subscribe to.
//! Every other crate that produces one of these publishes through an
//! `EventBus` handle rather than reaching into `nc-events` internals.

use chrono::{DateTime, Utc};
use nc_domain::{ExecutionStatus, JobStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    JobStatusChanged {
        job_id: Uuid,
        old_status: JobStatus,
        new_status: JobStatus,
        at: DateTime<Utc>,
    },
    ExecutionStarted {
        execution_id: Uuid,
        job_id: Uuid,
        at: DateTime<Utc>,
    },
    ExecutionCompleted {
        execution_id: Uuid,
        job_id: Uuid,
        status: ExecutionStatus,
        at: DateTime<Utc>,
    },
    HealthChanged {
        component: String,
        healthy: bool,
        detail: Option<String>,
        at: DateTime<Utc>,
    },
    CrawlProgress {
        job_id: Uuid,
        execution_id: Uuid,
        urls_discovered: u32,
        urls_fetched: u32,
        urls_failed: u32,
        at: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// SSE `event:` field — lets subscribers filter without parsing the
    /// JSON body first.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::JobStatusChanged { .. } => "job_status_changed",
            PipelineEvent::ExecutionStarted { .. } => "execution_started",
            PipelineEvent::ExecutionCompleted { .. } => "execution_completed",
            PipelineEvent::HealthChanged { .. } => "health_changed",
            PipelineEvent::CrawlProgress { .. } => "crawl_progress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let event = PipelineEvent::HealthChanged {
            component: "db".to_string(),
            healthy: true,
            detail: None,
            at: Utc::now(),
        };
        assert_eq!(event.kind(), "health_changed");
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = PipelineEvent::ExecutionStarted { execution_id: Uuid::new_v4(), job_id: Uuid::new_v4(), at: Utc::now() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ExecutionStarted");
    }
}
