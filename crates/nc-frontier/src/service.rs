//! Wires politeness, robots, and fetching into one claim-to-fetch
//! pipeline. Multiple `nc-crawler-worker` instances can run this
//! concurrently without coordination: `FrontierRepository::claim_batch`
//! uses `FOR UPDATE SKIP LOCKED`, so there is no single-leader
//! requirement here the way there is for the scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nc_config::FrontierConfig;
use nc_domain::FrontierUrl;
use nc_storage::frontier_repo::FetchOutcome;
use nc_storage::FrontierRepository;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fetcher::{FetchResult, Fetcher};
use crate::politeness::{GateDecision, PolitenessGate};
use crate::robots::RobotsCache;

/// A successfully fetched, never-before-seen (or changed) page, ready
/// for extraction.
pub struct FetchedPage {
    pub frontier_url: FrontierUrl,
    pub body: String,
}

/// Retries exhausted beyond this many attempts terminate the row as
/// `failed` rather than retrying forever against a permanently dead URL.
const DEFAULT_MAX_RETRIES: i32 = 5;

pub struct FrontierService {
    frontier: Arc<FrontierRepository>,
    politeness: Arc<PolitenessGate>,
    robots: Arc<RobotsCache>,
    fetcher: Arc<Fetcher>,
    config: FrontierConfig,
    instance_id: String,
}

impl FrontierService {
    pub fn new(
        frontier: Arc<FrontierRepository>,
        politeness: Arc<PolitenessGate>,
        robots: Arc<RobotsCache>,
        config: FrontierConfig,
        instance_id: String,
    ) -> Self {
        let fetcher = Arc::new(Fetcher::new(&config.user_agent, Duration::from_millis(config.fetch_timeout_ms)));
        Self { frontier, politeness, robots, fetcher, config, instance_id }
    }

    /// Claims up to `claim_batch_size` due rows and attempts to fetch
    /// each, honoring politeness and robots.txt. Rows that are deferred,
    /// skipped, or unchanged are not returned.
    pub async fn claim_and_fetch_batch(&self) -> Result<Vec<FetchedPage>> {
        let lease_ttl_secs = (self.config.fetch_timeout_ms / 1000).max(1) as i64 * 3;
        let claimed = self
            .frontier
            .claim_batch(self.config.claim_batch_size as i64, &self.instance_id, lease_ttl_secs)
            .await?;

        let mut pages = Vec::with_capacity(claimed.len());
        for url in claimed {
            if let Some(page) = self.process_one(url).await? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    async fn process_one(&self, claimed: FrontierUrl) -> Result<Option<FetchedPage>> {
        match self.politeness.check(&claimed).await? {
            GateDecision::Deferred => return Ok(None),
            GateDecision::Proceed(_host_state) => {}
        }

        if !self.robots.is_allowed(&claimed.host, &claimed.url).await? {
            debug!(url = %claimed.url, "skipped: disallowed by robots.txt");
            self.frontier
                .complete(claimed.id, FetchOutcome::Skipped { reason: "disallowed by robots.txt".to_string() })
                .await?;
            metrics::counter!("frontier.urls.robots_skipped_total").increment(1);
            return Ok(None);
        }

        match self.fetcher.fetch(&claimed).await? {
            FetchResult::Unchanged => {
                self.frontier.mark_unchanged(claimed.id).await?;
                metrics::counter!("frontier.urls.unchanged_total").increment(1);
                Ok(None)
            }
            FetchResult::New { body, content_hash, etag, last_modified } => {
                self.frontier.complete(claimed.id, FetchOutcome::Fetched { content_hash, etag, last_modified }).await?;
                metrics::counter!("frontier.urls.fetched_total").increment(1);
                Ok(Some(FetchedPage { frontier_url: claimed, body }))
            }
            FetchResult::TransportError(error) => {
                warn!(url = %claimed.url, error = %error, "fetch failed");
                let backoff_secs = 30i64.saturating_mul(2i64.saturating_pow(claimed.retry_count.min(10) as u32));
                let next_fetch_at = Utc::now() + chrono::Duration::seconds(backoff_secs);
                self.frontier
                    .complete(claimed.id, FetchOutcome::Failed { error, next_fetch_at, max_retries: DEFAULT_MAX_RETRIES })
                    .await?;
                metrics::counter!("frontier.urls.fetch_errors_total").increment(1);
                Ok(None)
            }
        }
    }

    pub async fn sweep_stale_leases(&self) -> Result<u64> {
        Ok(self.frontier.sweep_stale_leases().await?)
    }
}
