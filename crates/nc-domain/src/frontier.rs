//! The crawl frontier: URLs known to the crawler, host politeness state,
//! feed polling state, and the discovered-link observation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a URL first entered the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "frontier_origin", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FrontierOrigin {
    Seed,
    Discovered,
    Feed,
    Sitemap,
}

/// Frontier URL lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "frontier_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FrontierStatus {
    Pending,
    InFlight,
    Fetched,
    Failed,
    Skipped,
}

/// A URL known to the crawler.
///
/// `url_hash` is unique across the whole frontier and must equal
/// `SHA256(url)` (see [`nc_common::sha256_hex`]). A row is claimable iff
/// `status == Pending && next_fetch_at <= now`; claiming moves it to
/// `InFlight` under a time-bound lease (see the scheduler's concurrency
/// notes).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct FrontierUrl {
    pub id: Uuid,
    pub url_hash: String,
    pub url: String,
    pub host: String,
    pub source_id: Uuid,
    pub origin: FrontierOrigin,
    pub parent_url: Option<String>,
    pub depth: i32,
    pub priority: i16,
    pub status: FrontierStatus,
    pub next_fetch_at: DateTime<Utc>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub fetch_count: i32,
    pub content_hash: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    /// Worker that currently holds the in-flight lease, if any.
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl FrontierUrl {
    pub fn new(url: String, host: String, source_id: Uuid, origin: FrontierOrigin, parent_url: Option<String>, depth: i32) -> Self {
        let url_hash = nc_common::sha256_hex(&url);
        Self {
            id: Uuid::new_v4(),
            url_hash,
            url,
            host,
            source_id,
            origin,
            parent_url,
            depth,
            priority: 0,
            status: FrontierStatus::Pending,
            next_fetch_at: Utc::now(),
            last_fetched_at: None,
            fetch_count: 0,
            content_hash: None,
            etag: None,
            last_modified: None,
            retry_count: 0,
            last_error: None,
            lease_owner: None,
            lease_expires_at: None,
        }
    }

    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.status == FrontierStatus::Pending && self.next_fetch_at <= now
    }
}

/// Per-host politeness record. `host` is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct HostState {
    pub host: String,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub min_delay_ms: i64,
    pub robots_txt: Option<String>,
    pub robots_fetched_at: Option<DateTime<Utc>>,
    pub robots_ttl_hours: i32,
}

impl HostState {
    pub fn new(host: String) -> Self {
        Self {
            host,
            last_fetch_at: None,
            min_delay_ms: 1000,
            robots_txt: None,
            robots_fetched_at: None,
            robots_ttl_hours: 24,
        }
    }

    pub fn robots_is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.robots_fetched_at {
            None => true,
            Some(fetched_at) => now - fetched_at > chrono::Duration::hours(self.robots_ttl_hours as i64),
        }
    }

    pub fn may_fetch_at(&self) -> DateTime<Utc> {
        match self.last_fetch_at {
            Some(t) => t + chrono::Duration::milliseconds(self.min_delay_ms),
            None => Utc::now(),
        }
    }
}

/// Per-source RSS/Atom feed polling state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct FeedState {
    pub source_id: Uuid,
    pub feed_url: String,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub last_etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_item_count: i32,
    pub consecutive_errors: i32,
    pub last_error: Option<String>,
}

/// Record of a link observed during a crawl. Distinct from the frontier:
/// the frontier is the work queue, `discovered_links` is the append-only
/// observation log (unique on `(source_id, url)`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct DiscoveredLink {
    pub id: Uuid,
    pub source_id: Uuid,
    pub url: String,
    pub parent_url: Option<String>,
    pub depth: i32,
    pub discovered_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub priority: i16,
    pub status: FrontierStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_hash_is_sha256_of_url() {
        let url = "https://news.example.com/a".to_string();
        let frontier = FrontierUrl::new(url.clone(), "news.example.com".to_string(), Uuid::new_v4(), FrontierOrigin::Seed, None, 0);
        assert_eq!(frontier.url_hash, nc_common::sha256_hex(&url));
    }

    #[test]
    fn claimable_iff_pending_and_due() {
        let mut frontier = FrontierUrl::new("https://e.com/a".to_string(), "e.com".to_string(), Uuid::new_v4(), FrontierOrigin::Seed, None, 0);
        let now = Utc::now();
        assert!(frontier.is_claimable(now));
        frontier.status = FrontierStatus::InFlight;
        assert!(!frontier.is_claimable(now));
        frontier.status = FrontierStatus::Pending;
        frontier.next_fetch_at = now + chrono::Duration::seconds(60);
        assert!(!frontier.is_claimable(now));
    }

    #[test]
    fn host_state_respects_min_delay() {
        let mut host = HostState::new("e.com".to_string());
        let fetched_at = Utc::now();
        host.last_fetch_at = Some(fetched_at);
        host.min_delay_ms = 5000;
        assert_eq!(host.may_fetch_at(), fetched_at + chrono::Duration::milliseconds(5000));
    }

    #[test]
    fn robots_staleness_respects_ttl() {
        let mut host = HostState::new("e.com".to_string());
        assert!(host.robots_is_stale(Utc::now()));
        host.robots_fetched_at = Some(Utc::now());
        host.robots_ttl_hours = 24;
        assert!(!host.robots_is_stale(Utc::now()));
        assert!(host.robots_is_stale(Utc::now() + chrono::Duration::hours(25)));
    }
}
