//! Channel, route, and publish-history repositories.

use crate::error::{Result, StorageError};
use crate::source_repo::translate_insert_error;
use chrono::{DateTime, Utc};
use nc_domain::{Channel, PublishHistoryItem, Route};
use sqlx::PgPool;
use uuid::Uuid;

pub struct ChannelRepository {
    pool: PgPool,
}

impl ChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, channel: &Channel) -> Result<()> {
        sqlx::query(
            "INSERT INTO channels (id, name, slug, redis_channel, description, enabled, rules, created_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(&channel.slug)
        .bind(&channel.redis_channel)
        .bind(&channel.description)
        .bind(channel.enabled)
        .bind(sqlx::types::Json(&channel.rules))
        .bind(channel.created_at)
        .execute(&self.pool)
        .await
        .map_err(translate_insert_error("Channel", "slug"))?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Channel>> {
        Ok(sqlx::query_as::<_, Channel>("SELECT * FROM channels WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list_enabled(&self) -> Result<Vec<Channel>> {
        Ok(sqlx::query_as::<_, Channel>("SELECT * FROM channels WHERE enabled = true ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<Channel>> {
        Ok(sqlx::query_as::<_, Channel>("SELECT * FROM channels ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn update(&self, channel: &Channel) -> Result<()> {
        let result = sqlx::query(
            "UPDATE channels SET name = $2, slug = $3, redis_channel = $4, description = $5,
             enabled = $6, rules = $7 WHERE id = $1",
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(&channel.slug)
        .bind(&channel.redis_channel)
        .bind(&channel.description)
        .bind(channel.enabled)
        .bind(sqlx::types::Json(&channel.rules))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Channel", channel.id.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Channel", id.to_string()));
        }
        Ok(())
    }
}

pub struct RouteRepository {
    pool: PgPool,
}

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, route: &Route) -> Result<()> {
        sqlx::query(
            "INSERT INTO routes (id, source_id, channel_id, enabled, min_quality_score, topics)
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(route.id)
        .bind(route.source_id)
        .bind(route.channel_id)
        .bind(route.enabled)
        .bind(route.min_quality_score)
        .bind(&route.topics)
        .execute(&self.pool)
        .await
        .map_err(translate_insert_error("Route", "source_id,channel_id"))?;
        Ok(())
    }

    /// Enabled routes for `source_id`, joined against enabled Layer-2
    /// channels, since the router only cares about live routes to live
    /// channels.
    pub async fn find_enabled_for_source(&self, source_id: Uuid) -> Result<Vec<Route>> {
        Ok(sqlx::query_as::<_, Route>(
            "SELECT r.* FROM routes r JOIN channels c ON c.id = r.channel_id
             WHERE r.source_id = $1 AND r.enabled = true AND c.enabled = true",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find(&self, source_id: Uuid, channel_id: Uuid) -> Result<Option<Route>> {
        Ok(sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE source_id = $1 AND channel_id = $2")
            .bind(source_id)
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<Route>> {
        Ok(sqlx::query_as::<_, Route>("SELECT * FROM routes").fetch_all(&self.pool).await?)
    }

    pub async fn update(&self, route: &Route) -> Result<()> {
        let result = sqlx::query(
            "UPDATE routes SET enabled = $3, min_quality_score = $4, topics = $5
             WHERE source_id = $1 AND channel_id = $2",
        )
        .bind(route.source_id)
        .bind(route.channel_id)
        .bind(route.enabled)
        .bind(route.min_quality_score)
        .bind(&route.topics)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Route", route.id.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Route", id.to_string()));
        }
        Ok(())
    }
}

pub struct PublishHistoryRepository {
    pool: PgPool,
}

impl PublishHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a delivery record. Returns `false` without error when
    /// `(article_id, channel_name)` already exists — the publisher's
    /// idempotence guarantee (§4.5, §8) — so a retried publish is a
    /// silent no-op rather than a conflict the caller must handle.
    pub async fn try_record(&self, item: &PublishHistoryItem) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO publish_history
                (id, article_id, channel_name, article_title, article_url, quality_score, topics, published_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
             ON CONFLICT (article_id, channel_name) DO NOTHING",
        )
        .bind(item.id)
        .bind(&item.article_id)
        .bind(&item.channel_name)
        .bind(&item.article_title)
        .bind(&item.article_url)
        .bind(item.quality_score)
        .bind(&item.topics)
        .bind(item.published_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self, channel_name: Option<&str>, limit: i64, offset: i64) -> Result<Vec<PublishHistoryItem>> {
        match channel_name {
            Some(name) => Ok(sqlx::query_as::<_, PublishHistoryItem>(
                "SELECT * FROM publish_history WHERE channel_name = $1
                 ORDER BY published_at DESC LIMIT $2 OFFSET $3",
            )
            .bind(name)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?),
            None => Ok(sqlx::query_as::<_, PublishHistoryItem>(
                "SELECT * FROM publish_history ORDER BY published_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?),
        }
    }

    pub async fn find_for_article(&self, article_id: &str) -> Result<Vec<PublishHistoryItem>> {
        Ok(sqlx::query_as::<_, PublishHistoryItem>(
            "SELECT * FROM publish_history WHERE article_id = $1 ORDER BY published_at DESC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM publish_history").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_since(&self, channel_name: &str, since: DateTime<Utc>) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT count(*) FROM publish_history WHERE channel_name = $1 AND published_at >= $2",
        )
        .bind(channel_name)
        .bind(since)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Total deliveries across every channel since `since` — §6
    /// `GET /api/v1/stats/overview`'s per-period counter.
    pub async fn count_all_since(&self, since: DateTime<Utc>) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT count(*) FROM publish_history WHERE published_at >= $1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}
