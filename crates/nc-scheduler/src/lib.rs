//! Job scheduling: due-set polling with CAS claim, cron/interval
//! next-run computation, backoff, dependency gating, stale-execution
//! recovery, and event-triggered dispatch.
//!
//! Single-leader within a replica set: every loop in this crate should
//! be wrapped in an [`nc_standby::StandbyGuard`] so only the elected
//! leader polls.

pub mod cron;
pub mod error;
pub mod event_dispatch;
pub mod next_run;
pub mod poller;
pub mod runner;
pub mod stale_recovery;

pub use cron::{legacy_cron_to_interval_minutes, CronSchedule};
pub use error::{Result, SchedulerError};
pub use event_dispatch::EventDispatcher;
pub use next_run::compute_next_run_at;
pub use poller::SchedulerService;
pub use runner::{JobRunFailure, JobRunOutcome, JobRunner};
pub use stale_recovery::StaleExecutionRecovery;
