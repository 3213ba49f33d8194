//! Frontier, host-politeness, feed-state, and discovered-link repositories.
//!
//! `claim_batch` is to the frontier what `JobRepository::claim` is to jobs:
//! a single `UPDATE ... RETURNING` driven by a `FOR UPDATE SKIP LOCKED`
//! subselect, so concurrent fetchers never claim the same row twice.

use crate::error::Result;
use chrono::{DateTime, Utc};
use nc_domain::{DiscoveredLink, FeedState, FrontierStatus, FrontierUrl, HostState};
use sqlx::PgPool;
use uuid::Uuid;

/// Outcome of a fetch attempt, passed to [`FrontierRepository::complete`].
pub enum FetchOutcome {
    Fetched {
        content_hash: String,
        etag: Option<String>,
        last_modified: Option<String>,
    },
    Failed {
        error: String,
        next_fetch_at: DateTime<Utc>,
        max_retries: i32,
    },
    Skipped {
        reason: String,
    },
}

pub struct FrontierRepository {
    pool: PgPool,
}

impl FrontierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new frontier URL, or on conflict by `url_hash` keeps the
    /// better (max) priority and leaves status untouched — a terminal
    /// row is never silently reopened by a rediscovered link.
    pub async fn upsert(&self, url: &FrontierUrl) -> Result<FrontierUrl> {
        Ok(sqlx::query_as::<_, FrontierUrl>(
            "INSERT INTO frontier_urls
                (id, url_hash, url, host, source_id, origin, parent_url, depth, priority,
                 status, next_fetch_at, last_fetched_at, fetch_count, content_hash, etag,
                 last_modified, retry_count, last_error, lease_owner, lease_expires_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)
             ON CONFLICT (url_hash) DO UPDATE
                SET priority = GREATEST(frontier_urls.priority, EXCLUDED.priority)
             RETURNING *",
        )
        .bind(url.id)
        .bind(&url.url_hash)
        .bind(&url.url)
        .bind(&url.host)
        .bind(url.source_id)
        .bind(url.origin)
        .bind(&url.parent_url)
        .bind(url.depth)
        .bind(url.priority)
        .bind(url.status)
        .bind(url.next_fetch_at)
        .bind(url.last_fetched_at)
        .bind(url.fetch_count)
        .bind(&url.content_hash)
        .bind(&url.etag)
        .bind(&url.last_modified)
        .bind(url.retry_count)
        .bind(&url.last_error)
        .bind(&url.lease_owner)
        .bind(url.lease_expires_at)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Atomically claims up to `n` due rows under a time-bound lease.
    pub async fn claim_batch(&self, n: i64, lease_owner: &str, lease_ttl_secs: i64) -> Result<Vec<FrontierUrl>> {
        Ok(sqlx::query_as::<_, FrontierUrl>(
            "UPDATE frontier_urls SET
                status = 'in_flight',
                lease_owner = $1,
                lease_expires_at = now() + make_interval(secs => $2)
             WHERE id IN (
                SELECT id FROM frontier_urls
                WHERE status = 'pending' AND next_fetch_at <= now()
                ORDER BY priority DESC, next_fetch_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
             )
             RETURNING *",
        )
        .bind(lease_owner)
        .bind(lease_ttl_secs as f64)
        .bind(n)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Returns expired in-flight leases to `pending` so a crashed fetcher
    /// doesn't strand work forever.
    pub async fn sweep_stale_leases(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE frontier_urls SET status = 'pending', lease_owner = NULL, lease_expires_at = NULL
             WHERE status = 'in_flight' AND lease_expires_at < now()",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn complete(&self, id: Uuid, outcome: FetchOutcome) -> Result<()> {
        match outcome {
            FetchOutcome::Fetched { content_hash, etag, last_modified } => {
                sqlx::query(
                    "UPDATE frontier_urls SET
                        status = 'fetched', content_hash = $2, etag = $3, last_modified = $4,
                        last_fetched_at = now(), fetch_count = fetch_count + 1,
                        lease_owner = NULL, lease_expires_at = NULL
                     WHERE id = $1",
                )
                .bind(id)
                .bind(content_hash)
                .bind(etag)
                .bind(last_modified)
                .execute(&self.pool)
                .await?;
            }
            FetchOutcome::Failed { error, next_fetch_at, max_retries } => {
                sqlx::query(
                    "UPDATE frontier_urls SET
                        retry_count = retry_count + 1,
                        last_error = $2,
                        last_fetched_at = now(),
                        lease_owner = NULL, lease_expires_at = NULL,
                        status = CASE WHEN retry_count + 1 >= $4 THEN 'failed'::frontier_status ELSE 'pending'::frontier_status END,
                        next_fetch_at = CASE WHEN retry_count + 1 >= $4 THEN next_fetch_at ELSE $3 END
                     WHERE id = $1",
                )
                .bind(id)
                .bind(error)
                .bind(next_fetch_at)
                .bind(max_retries)
                .execute(&self.pool)
                .await?;
            }
            FetchOutcome::Skipped { reason } => {
                sqlx::query(
                    "UPDATE frontier_urls SET status = 'skipped', last_error = $2,
                        lease_owner = NULL, lease_expires_at = NULL, last_fetched_at = now()
                     WHERE id = $1",
                )
                .bind(id)
                .bind(reason)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Releases a claimed row back to `pending` without counting it as a
    /// failure — used by the politeness gate when a host's min-delay
    /// hasn't elapsed yet (§4.2: "defer via `next_fetch_at = earliest`
    /// and release the claim").
    pub async fn defer(&self, id: Uuid, next_fetch_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE frontier_urls SET status = 'pending', next_fetch_at = $2,
                lease_owner = NULL, lease_expires_at = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(next_fetch_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks a fetch as "unchanged" (conditional GET 304): still updates
    /// `last_fetched_at`/`fetch_count` but leaves `content_hash` alone so
    /// the caller's dedup short-circuit holds, and does not re-trigger
    /// extraction downstream.
    pub async fn mark_unchanged(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE frontier_urls SET status = 'fetched', last_fetched_at = now(),
                fetch_count = fetch_count + 1, lease_owner = NULL, lease_expires_at = NULL
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_url_hash(&self, url_hash: &str) -> Result<Option<FrontierUrl>> {
        Ok(sqlx::query_as::<_, FrontierUrl>("SELECT * FROM frontier_urls WHERE url_hash = $1")
            .bind(url_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn count_by_status(&self, source_id: Uuid, status: FrontierStatus) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT count(*) FROM frontier_urls WHERE source_id = $1 AND status = $2",
        )
        .bind(source_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?)
    }
}

/// Per-host politeness ledger.
pub struct HostStateRepository {
    pool: PgPool,
}

impl HostStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_or_create(&self, host: &str) -> Result<HostState> {
        Ok(sqlx::query_as::<_, HostState>(
            "INSERT INTO host_state (host) VALUES ($1)
             ON CONFLICT (host) DO UPDATE SET host = EXCLUDED.host
             RETURNING *",
        )
        .bind(host)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn record_fetch(&self, host: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE host_state SET last_fetch_at = $2 WHERE host = $1")
            .bind(host)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_robots(&self, host: &str, robots_txt: &str, fetched_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE host_state SET robots_txt = $2, robots_fetched_at = $3 WHERE host = $1")
            .bind(host)
            .bind(robots_txt)
            .bind(fetched_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_min_delay(&self, host: &str, min_delay_ms: i64) -> Result<()> {
        sqlx::query("UPDATE host_state SET min_delay_ms = $2 WHERE host = $1")
            .bind(host)
            .bind(min_delay_ms)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct FeedStateRepository {
    pool: PgPool,
}

impl FeedStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, source_id: Uuid) -> Result<Option<FeedState>> {
        Ok(sqlx::query_as::<_, FeedState>("SELECT * FROM feed_state WHERE source_id = $1")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn upsert(&self, state: &FeedState) -> Result<()> {
        sqlx::query(
            "INSERT INTO feed_state (source_id, feed_url, last_polled_at, last_etag, last_modified,
             last_item_count, consecutive_errors, last_error)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
             ON CONFLICT (source_id) DO UPDATE SET
                feed_url = EXCLUDED.feed_url, last_polled_at = EXCLUDED.last_polled_at,
                last_etag = EXCLUDED.last_etag, last_modified = EXCLUDED.last_modified,
                last_item_count = EXCLUDED.last_item_count,
                consecutive_errors = EXCLUDED.consecutive_errors, last_error = EXCLUDED.last_error",
        )
        .bind(state.source_id)
        .bind(&state.feed_url)
        .bind(state.last_polled_at)
        .bind(&state.last_etag)
        .bind(&state.last_modified)
        .bind(state.last_item_count)
        .bind(state.consecutive_errors)
        .bind(&state.last_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct DiscoveredLinkRepository {
    pool: PgPool,
}

impl DiscoveredLinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records an observed link. Idempotent on `(source_id, url)`: a link
    /// seen twice updates nothing but also doesn't error.
    pub async fn record(&self, link: &DiscoveredLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO discovered_links (id, source_id, url, parent_url, depth, discovered_at,
             queued_at, priority, status)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
             ON CONFLICT (source_id, url) DO NOTHING",
        )
        .bind(link.id)
        .bind(link.source_id)
        .bind(&link.url)
        .bind(&link.parent_url)
        .bind(link.depth)
        .bind(link.discovered_at)
        .bind(link.queued_at)
        .bind(link.priority)
        .bind(link.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_queued(&self, source_id: Uuid, url: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE discovered_links SET queued_at = $3, status = 'pending' WHERE source_id = $1 AND url = $2")
            .bind(source_id)
            .bind(url)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FetchOutcome;

    #[test]
    fn fetch_outcome_variants_construct() {
        let _ = FetchOutcome::Skipped { reason: "disallowed by robots.txt".to_string() };
    }
}
