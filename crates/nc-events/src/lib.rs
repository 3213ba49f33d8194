//! L14: realtime event bus. Job/execution/health/crawl events produced by
//! `nc-scheduler`, `nc-frontier`, and `nc-router` are published here and
//! fanned out to admin UI subscribers over Server-Sent Events.

pub mod bus;
pub mod event;
pub mod sse;

pub use bus::EventBus;
pub use event::PipelineEvent;
pub use sse::event_stream;
