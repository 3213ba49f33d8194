//! Bridges Layer 1/2 channel deliveries (published by `nc-router-worker`
//! over Redis pub/sub, see `nc_router::Publisher`) onto
//! `EventDispatcher::handle_channel_event`, so `event`-scheduled jobs
//! (§4.1 step 6) fire when a matching delivery happens anywhere in the
//! pipeline.
//!
//! Redis pub/sub carries no message id, so the dedup id the
//! `ProcessedEvent` ledger checks is derived deterministically from the
//! delivery itself (`article_id` + `channel_name`): the same delivery
//! replayed (e.g. a publisher retry after a crash) always hashes to the
//! same id, giving the at-least-once-delivery/at-most-once-dispatch
//! property §4.1 step 6 asks for without needing a persistent stream
//! offset.

use std::sync::Arc;

use futures::StreamExt;
use nc_scheduler::EventDispatcher;
use serde::Deserialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Namespace for the deterministic `(article_id, channel_name)` event id.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6e, 0x63, 0x2d, 0x65, 0x76, 0x65, 0x6e, 0x74, 0x2d, 0x62, 0x72, 0x69, 0x64, 0x67, 0x65, 0x00,
]);

#[derive(Debug, Deserialize)]
struct DeliveryMessage {
    article_id: String,
    channel_name: String,
}

/// Subscribes to every channel in `channels` and forwards deliveries to
/// `dispatcher`. Runs until the process exits or the Redis connection is
/// dropped; callers should retry on error.
pub async fn run(redis_url: &str, channels: Vec<String>, dispatcher: Arc<EventDispatcher>) -> anyhow::Result<()> {
    if channels.is_empty() {
        debug!("no channels to subscribe to for event dispatch");
        return Ok(());
    }

    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    for channel in &channels {
        pubsub.subscribe(channel).await?;
    }
    tracing::info!(count = channels.len(), "subscribed to channels for event-triggered job dispatch");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let channel_name: String = msg.get_channel_name().to_string();
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(error) => {
                warn!(channel = %channel_name, error = %error, "failed to read pub/sub payload");
                continue;
            }
        };

        let delivery: DeliveryMessage = match serde_json::from_str(&payload) {
            Ok(delivery) => delivery,
            Err(error) => {
                warn!(channel = %channel_name, error = %error, "undecodable delivery payload, skipping");
                continue;
            }
        };

        let event_id = Uuid::new_v5(&EVENT_ID_NAMESPACE, format!("{}:{}", delivery.article_id, delivery.channel_name).as_bytes());
        if let Err(error) = dispatcher.handle_channel_event(event_id, &delivery.channel_name).await {
            error!(channel = %channel_name, error = %error, "failed to dispatch channel event");
        }
    }

    Ok(())
}
