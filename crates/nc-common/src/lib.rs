//! Shared types and helpers used across the ingestion pipeline crates.

pub mod logging;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `input`.
///
/// Used both for `FrontierUrl::url_hash` (§3 invariant: `SHA256(F.url) =
/// F.url_hash`) and for `RawContent` id generation (§4.3: "article-level id
/// = hex(SHA256(url)) when not available in source DOM").
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Truncates `s` to at most `max_chars` characters, respecting UTF-8
/// boundaries (used when storing response bodies / error snippets that
/// must not blow up log lines or column sizes).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

/// Milliseconds between two timestamps, floored, never negative.
///
/// Mirrors §3's `JobExecution.duration_ms = completed_at - started_at`.
pub fn duration_ms(started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> i64 {
    (completed_at - started_at).num_milliseconds().max(0)
}

/// A cancellation signal shared between a job execution and the workers
/// processing it, bound to either a job timeout or a process shutdown
/// (§5: "operations accept a cancellation token ... must honor it within
/// bounded time (≤ 1s after trigger)").
#[derive(Clone)]
pub struct CancellationToken {
    inner: std::sync::Arc<tokio::sync::Notify>,
    cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(tokio::sync::Notify::new()),
            cancelled: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self.inner.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_deterministic_and_correct_length() {
        let a = sha256_hex("https://example.com/a");
        let b = sha256_hex("https://example.com/a");
        let c = sha256_hex("https://example.com/b");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn truncate_chars_respects_utf8_boundaries() {
        let s = "héllo wörld";
        let truncated = truncate_chars(s, 5);
        assert_eq!(truncated.chars().count(), 5);
    }

    #[test]
    fn duration_ms_never_negative() {
        let t = Utc::now();
        assert_eq!(duration_ms(t, t - chrono::Duration::seconds(5)), 0);
        assert_eq!(duration_ms(t, t + chrono::Duration::seconds(2)), 2000);
    }

    #[tokio::test]
    async fn cancellation_token_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }
}
