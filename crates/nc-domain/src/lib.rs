//! Core domain types shared by every stage of the ingestion pipeline:
//! scheduler, frontier/fetcher, extractor, and router.
//!
//! Types here are storage-agnostic in shape but carry `sqlx::Type` /
//! `sqlx::FromRow` derives so `nc-storage` can map rows directly onto
//! them without a separate DTO layer, mirroring how the platform crate
//! in this workspace keeps its entities next to its repositories.

pub mod channel;
pub mod content;
pub mod frontier;
pub mod job;
pub mod source;

pub use channel::{layer1_channel_name, Channel, ChannelRules, PublishHistoryItem, Route};
pub use content::{normalize_json_ld, Article, ClassificationStatus, ContentType, JsonLdValue, RawContent, Relevance};
pub use frontier::{DiscoveredLink, FeedState, FrontierOrigin, FrontierStatus, FrontierUrl, HostState};
pub use job::{DispatchTrigger, Job, JobExecution, ExecutionStatus, JobStatus, ScheduleType};
pub use source::{Source, SourceSelectors};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An at-least-once delivery idempotency record. Any component consuming
/// an event (scheduler reacting to channel triggers, etc) inserts a row
/// keyed by the event id before acting; a unique-constraint violation on
/// insert means the event was already processed.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct ProcessedEvent {
    pub id: Uuid,
    pub processed_at: DateTime<Utc>,
}
