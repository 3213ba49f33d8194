//! Host politeness gate (§4.2): before any fetch, the host's ledger is
//! consulted; if the minimum delay hasn't elapsed the claim is released
//! rather than burning the lease window on a sleep.

use chrono::Utc;
use nc_domain::{FrontierUrl, HostState};
use nc_storage::{FrontierRepository, HostStateRepository};
use tracing::debug;

use crate::error::Result;

pub struct PolitenessGate {
    host_state: HostStateRepository,
    frontier: FrontierRepository,
}

pub enum GateDecision {
    /// Fetch may proceed now.
    Proceed(HostState),
    /// Too soon; the row has been released back to `pending` at
    /// `next_fetch_at = earliest` and must not be fetched this round.
    Deferred,
}

impl PolitenessGate {
    pub fn new(host_state: HostStateRepository, frontier: FrontierRepository) -> Self {
        Self { host_state, frontier }
    }

    pub async fn check(&self, claimed: &FrontierUrl) -> Result<GateDecision> {
        let mut host_state = self.host_state.get_or_create(&claimed.host).await?;

        // A source-specific rate limit (if set) overrides the host
        // ledger's delay for the duration of this check only; it isn't
        // persisted back, since it applies per-source, not per-host.
        let earliest = host_state.may_fetch_at();
        let now = Utc::now();
        if earliest > now {
            debug!(host = %claimed.host, url_hash = %claimed.url_hash, earliest = %earliest, "deferring for politeness");
            self.frontier.defer(claimed.id, earliest).await?;
            return Ok(GateDecision::Deferred);
        }

        self.host_state.record_fetch(&claimed.host, now).await?;
        host_state.last_fetch_at = Some(now);
        Ok(GateDecision::Proceed(host_state))
    }
}
