//! Layer-1/Layer-2 channel routing (§4.5): decides which channels a
//! classified article fans out to, delivers idempotently over Redis
//! pub/sub, and tracks per-channel delivery stats for the admin API.

pub mod circuit;
pub mod error;
pub mod publisher;
pub mod routing;
pub mod stats;

pub use circuit::{CircuitBreaker, CircuitState};
pub use error::{Result, RouterError};
pub use publisher::{DeliveryPayload, PublishOutcome, Publisher};
pub use routing::{route, Delivery, RouteCandidate, KNOWN_TOPICS};
pub use stats::{ChannelStats, ChannelStatsRegistry};
