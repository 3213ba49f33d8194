//! §4.5/§6: idempotent article delivery to Layer-1/Layer-2 Redis
//! channels. The history write happens before the publish attempt so a
//! crash mid-delivery never double-sends on retry, and a publish failure
//! never loses the history record — at-least-once on the wire, exactly-
//! once in `publish_history`.

use crate::circuit::CircuitBreaker;
use crate::error::Result;
use crate::routing::Delivery;
use crate::stats::ChannelStatsRegistry;
use chrono::Utc;
use nc_config::RouterConfig;
use nc_domain::{Article, PublishHistoryItem};
use nc_storage::PublishHistoryRepository;
use redis::aio::ConnectionManager;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Wire payload for a single delivery (§6).
#[derive(Debug, Serialize)]
pub struct DeliveryPayload<'a> {
    pub article_id: &'a str,
    pub url: &'a str,
    pub title: &'a str,
    pub source_name: &'a str,
    pub topics: &'a [String],
    pub quality_score: i16,
    pub published_at: Option<chrono::DateTime<Utc>>,
    pub channel_name: &'a str,
    pub delivered_at: chrono::DateTime<Utc>,
}

pub struct Publisher {
    redis: ConnectionManager,
    history: PublishHistoryRepository,
    stats: Arc<ChannelStatsRegistry>,
    breaker: CircuitBreaker,
    breaker_enabled: bool,
}

impl Publisher {
    pub fn new(
        redis: ConnectionManager,
        history: PublishHistoryRepository,
        stats: Arc<ChannelStatsRegistry>,
        config: &RouterConfig,
    ) -> Self {
        Self {
            redis,
            history,
            stats,
            breaker: CircuitBreaker::new(
                config.circuit_breaker_threshold,
                2,
                std::time::Duration::from_secs(config.circuit_breaker_reset_secs),
            ),
            breaker_enabled: config.circuit_breaker_enabled,
        }
    }

    /// Delivers `article` to every target in `deliveries`. Each target is
    /// handled independently: one channel's Redis failure never blocks
    /// another's delivery, matching §4.5's per-channel failure isolation.
    pub async fn publish_all(&mut self, article: &Article, deliveries: &[Delivery]) -> Vec<PublishOutcome> {
        let mut outcomes = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            outcomes.push(self.publish_one(article, delivery).await);
        }
        outcomes
    }

    async fn publish_one(&mut self, article: &Article, delivery: &Delivery) -> PublishOutcome {
        let history_item = PublishHistoryItem {
            id: Uuid::new_v4(),
            article_id: article.raw.id.clone(),
            channel_name: delivery.channel_name.clone(),
            article_title: article.raw.title.clone(),
            article_url: article.raw.url.clone(),
            quality_score: article.quality_score,
            topics: article.topic_tags.clone(),
            published_at: Utc::now(),
        };

        let recorded = match self.history.try_record(&history_item).await {
            Ok(recorded) => recorded,
            Err(err) => {
                warn!(channel = %delivery.channel_name, error = %err, "publish history write failed");
                return PublishOutcome::HistoryError;
            }
        };

        if !recorded {
            debug!(channel = %delivery.channel_name, article_id = %article.raw.id, "already delivered, skipping");
            return PublishOutcome::AlreadyDelivered;
        }

        if self.breaker_enabled && !self.breaker.allow_request() {
            metrics::counter!("nc_router_publish_rejected_total", "channel" => delivery.channel_name.clone()).increment(1);
            self.stats.record_failed(&delivery.channel_name);
            return PublishOutcome::CircuitOpen;
        }

        let payload = DeliveryPayload {
            article_id: &article.raw.id,
            url: &article.raw.url,
            title: &article.raw.title,
            source_name: &article.raw.source_name,
            topics: &article.topic_tags,
            quality_score: article.quality_score,
            published_at: article.raw.published_date,
            channel_name: &delivery.channel_name,
            delivered_at: Utc::now(),
        };

        let start = Instant::now();
        let result = self.publish_payload(&delivery.redis_channel, &payload).await;
        let elapsed = start.elapsed();

        metrics::histogram!("nc_router_publish_duration_seconds", "channel" => delivery.channel_name.clone())
            .record(elapsed.as_secs_f64());

        match result {
            Ok(()) => {
                if self.breaker_enabled {
                    self.breaker.record_success();
                }
                self.stats.record_delivered(&delivery.channel_name);
                metrics::counter!("nc_router_published_total", "channel" => delivery.channel_name.clone()).increment(1);
                info!(channel = %delivery.channel_name, article_id = %article.raw.id, "delivered");
                PublishOutcome::Delivered
            }
            Err(err) => {
                if self.breaker_enabled {
                    self.breaker.record_failure();
                }
                self.stats.record_failed(&delivery.channel_name);
                metrics::counter!("nc_router_publish_failed_total", "channel" => delivery.channel_name.clone()).increment(1);
                warn!(channel = %delivery.channel_name, error = %err, "publish failed after history was recorded");
                PublishOutcome::TransportError
            }
        }
    }

    async fn publish_payload(&mut self, redis_channel: &str, payload: &DeliveryPayload<'_>) -> Result<()> {
        let body = serde_json::to_string(payload)?;
        let _subscriber_count: i64 = redis::cmd("PUBLISH")
            .arg(redis_channel)
            .arg(body)
            .query_async(&mut self.redis)
            .await?;
        Ok(())
    }
}

/// Per-delivery outcome, distinct from [`crate::error::RouterError`]
/// since a failed delivery is an expected, individually-handled outcome
/// rather than a propagated error (§4.5: failures are isolated per
/// channel, not fatal to the batch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    AlreadyDelivered,
    CircuitOpen,
    TransportError,
    HistoryError,
}
