//! Per-channel delivery stats backing `GET /api/v1/stats/*` (§4.6). A
//! thin sliding-window collector, one per channel, grounded on the
//! teacher's `PoolMetricsCollector`: all-time atomic counters plus a
//! bounded sample deque for a 5-minute window.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(300);
const MAX_SAMPLES: usize = 10_000;

struct Sample {
    at: Instant,
    delivered: bool,
}

struct ChannelCounter {
    total_delivered: AtomicU64,
    total_failed: AtomicU64,
    samples: RwLock<VecDeque<Sample>>,
}

impl ChannelCounter {
    fn new() -> Self {
        Self {
            total_delivered: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            samples: RwLock::new(VecDeque::with_capacity(256)),
        }
    }

    fn record(&self, delivered: bool) {
        if delivered {
            self.total_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failed.fetch_add(1, Ordering::Relaxed);
        }
        let mut samples = self.samples.write();
        let cutoff = Instant::now() - WINDOW;
        while samples.front().map(|s| s.at < cutoff).unwrap_or(false) {
            samples.pop_front();
        }
        samples.push_back(Sample { at: Instant::now(), delivered });
        while samples.len() > MAX_SAMPLES {
            samples.pop_front();
        }
    }

    fn snapshot(&self) -> ChannelStats {
        let samples = self.samples.read();
        let cutoff = Instant::now() - WINDOW;
        let windowed: Vec<&Sample> = samples.iter().filter(|s| s.at >= cutoff).collect();
        let delivered_5min = windowed.iter().filter(|s| s.delivered).count() as u64;
        let failed_5min = windowed.iter().filter(|s| !s.delivered).count() as u64;

        ChannelStats {
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            delivered_last_5min: delivered_5min,
            failed_last_5min: failed_5min,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, utoipa::ToSchema)]
pub struct ChannelStats {
    pub total_delivered: u64,
    pub total_failed: u64,
    pub delivered_last_5min: u64,
    pub failed_last_5min: u64,
}

impl ChannelStats {
    pub fn is_active(&self) -> bool {
        self.delivered_last_5min > 0
    }
}

/// Registry of per-channel counters, keyed by channel name. Shared behind
/// an `Arc` between the router worker (writer) and the admin API (reader).
#[derive(Default)]
pub struct ChannelStatsRegistry {
    channels: RwLock<HashMap<String, ChannelCounter>>,
}

impl ChannelStatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivered(&self, channel_name: &str) {
        self.record(channel_name, true);
    }

    pub fn record_failed(&self, channel_name: &str) {
        self.record(channel_name, false);
    }

    fn record(&self, channel_name: &str, delivered: bool) {
        if !self.channels.read().contains_key(channel_name) {
            self.channels.write().entry(channel_name.to_string()).or_insert_with(ChannelCounter::new);
        }
        self.channels.read().get(channel_name).expect("just inserted").record(delivered);
    }

    pub fn snapshot(&self, channel_name: &str) -> ChannelStats {
        self.channels.read().get(channel_name).map(ChannelCounter::snapshot).unwrap_or_default()
    }

    pub fn snapshot_all(&self) -> HashMap<String, ChannelStats> {
        self.channels.read().iter().map(|(name, counter)| (name.clone(), counter.snapshot())).collect()
    }

    pub fn active_channels(&self) -> Vec<String> {
        self.channels
            .read()
            .iter()
            .filter(|(_, counter)| counter.snapshot().is_active())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_delivered_and_failed_separately() {
        let registry = ChannelStatsRegistry::new();
        registry.record_delivered("articles:sports");
        registry.record_delivered("articles:sports");
        registry.record_failed("articles:sports");

        let stats = registry.snapshot("articles:sports");
        assert_eq!(stats.total_delivered, 2);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.delivered_last_5min, 2);
    }

    #[test]
    fn unknown_channel_returns_zeroed_stats() {
        let registry = ChannelStatsRegistry::new();
        let stats = registry.snapshot("never-seen");
        assert_eq!(stats.total_delivered, 0);
        assert!(!stats.is_active());
    }

    #[test]
    fn active_channels_lists_only_recently_delivered() {
        let registry = ChannelStatsRegistry::new();
        registry.record_delivered("articles:sports");
        registry.record_failed("articles:weather");

        let active = registry.active_channels();
        assert!(active.contains(&"articles:sports".to_string()));
        assert!(!active.contains(&"articles:weather".to_string()));
    }
}
