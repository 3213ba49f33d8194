//! Crawl frontier and fetcher: host politeness, robots.txt caching,
//! conditional GET with content-hash dedup, and the claim-to-fetch
//! pipeline that feeds the extractor.

pub mod error;
pub mod fetcher;
pub mod politeness;
pub mod robots;
pub mod service;

pub use error::{FrontierError, Result};
pub use fetcher::{FetchResult, Fetcher};
pub use politeness::{GateDecision, PolitenessGate};
pub use robots::RobotsCache;
pub use service::{FetchedPage, FrontierService};
