//! Postgres row-CAS leader election.
//!
//! Shape mirrors the teacher's Redis-backed `LeaderElection`
//! (`fc-standby::leader`): an election tick on a timer, an atomic
//! leadership flag, a `watch` channel subscribers can wait on, and a
//! `StandbyGuard` to gate work on leadership. The acquire/extend/release
//! primitives are backed by [`nc_storage::LeaderLeaseRepository`]'s row
//! CAS instead of `SET NX EX` / Lua scripts, per §5: "durable tables are
//! the only source of truth for cross-process coordination" and "leader
//! operations must still use CAS on job rows in case of split-brain
//! during lease renewal".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nc_storage::LeaderLeaseRepository;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::error::{Result, StandbyError};

#[derive(Debug, Clone)]
pub struct LeaderElectionConfig {
    pub lease_name: String,
    pub lease_ttl_secs: u64,
    pub refresh_interval_secs: u64,
    pub instance_id: String,
}

impl Default for LeaderElectionConfig {
    fn default() -> Self {
        Self {
            lease_name: "nc:scheduler:leader".to_string(),
            lease_ttl_secs: 30,
            refresh_interval_secs: 10,
            instance_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadershipStatus {
    Leader,
    Follower,
    Unknown,
}

pub struct LeaderElection {
    config: LeaderElectionConfig,
    repo: Arc<LeaderLeaseRepository>,
    is_leader: AtomicBool,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    status_tx: watch::Sender<LeadershipStatus>,
    status_rx: watch::Receiver<LeadershipStatus>,
}

impl LeaderElection {
    pub fn new(config: LeaderElectionConfig, repo: Arc<LeaderLeaseRepository>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (status_tx, status_rx) = watch::channel(LeadershipStatus::Unknown);
        Self {
            config,
            repo,
            is_leader: AtomicBool::new(false),
            running: AtomicBool::new(false),
            shutdown_tx,
            status_tx,
            status_rx,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> LeadershipStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LeadershipStatus> {
        self.status_rx.clone()
    }

    pub fn instance_id(&self) -> &str {
        &self.config.instance_id
    }

    /// Starts the background election loop. Re-elects at
    /// `refresh_interval_secs`, which §4.1 requires be at most half the
    /// lease TTL so a lagging heartbeat doesn't lapse the lease.
    pub fn start(self: Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(StandbyError::AlreadyRunning);
        }

        info!(instance_id = %self.config.instance_id, lease = %self.config.lease_name, "starting leader election");

        let election = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(election.config.refresh_interval_secs));
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        election.election_tick().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!(instance_id = %election.config.instance_id, "leader election shutting down");
                        election.release_leadership().await;
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    async fn election_tick(&self) {
        if self.is_leader() {
            match self.extend_lease().await {
                Ok(true) => debug!(instance_id = %self.config.instance_id, "extended leadership lease"),
                Ok(false) => {
                    warn!(instance_id = %self.config.instance_id, "lost leadership");
                    self.set_status(LeadershipStatus::Follower);
                }
                Err(e) => {
                    error!(error = %e, "failed to extend leadership lease");
                    self.set_status(LeadershipStatus::Follower);
                }
            }
        } else {
            match self.try_acquire_leadership().await {
                Ok(true) => {
                    info!(instance_id = %self.config.instance_id, "acquired leadership");
                    self.set_status(LeadershipStatus::Leader);
                }
                Ok(false) => {
                    debug!(instance_id = %self.config.instance_id, "leadership held by another instance");
                    self.set_status(LeadershipStatus::Follower);
                }
                Err(e) => {
                    error!(error = %e, "failed to acquire leadership");
                    self.set_status(LeadershipStatus::Unknown);
                }
            }
        }
    }

    async fn try_acquire_leadership(&self) -> Result<bool> {
        let expires_at = Utc::now() + chrono::Duration::seconds(self.config.lease_ttl_secs as i64);
        Ok(self.repo.try_acquire(&self.config.lease_name, &self.config.instance_id, expires_at).await?)
    }

    async fn extend_lease(&self) -> Result<bool> {
        let expires_at = Utc::now() + chrono::Duration::seconds(self.config.lease_ttl_secs as i64);
        Ok(self.repo.try_extend(&self.config.lease_name, &self.config.instance_id, expires_at).await?)
    }

    async fn release_leadership(&self) {
        if !self.is_leader() {
            return;
        }
        if let Err(e) = self.repo.release(&self.config.lease_name, &self.config.instance_id).await {
            error!(error = %e, "failed to release leadership");
        } else {
            info!(instance_id = %self.config.instance_id, "released leadership");
        }
        self.set_status(LeadershipStatus::Follower);
    }

    fn set_status(&self, status: LeadershipStatus) {
        let was_leader = self.is_leader.load(Ordering::SeqCst);
        let is_now_leader = status == LeadershipStatus::Leader;
        self.is_leader.store(is_now_leader, Ordering::SeqCst);
        let _ = self.status_tx.send(status);
        if was_leader != is_now_leader && !is_now_leader {
            info!(instance_id = %self.config.instance_id, "stepped down from leadership");
        }
    }

    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

/// Gates work on current leadership, the way every leader-only loop in
/// this workspace (scheduler claim loop, stale-lease sweeper) should be
/// wrapped.
pub struct StandbyGuard {
    election: Arc<LeaderElection>,
}

impl StandbyGuard {
    pub fn new(election: Arc<LeaderElection>) -> Self {
        Self { election }
    }

    pub fn should_process(&self) -> bool {
        self.election.is_leader()
    }

    pub async fn run_if_leader<F, Fut, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        if self.election.is_leader() {
            Some(f().await)
        } else {
            None
        }
    }

    pub async fn wait_for_leadership(&self) {
        let mut rx = self.election.subscribe();
        while *rx.borrow() != LeadershipStatus::Leader {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_refresh_is_half_the_ttl_or_less() {
        let config = LeaderElectionConfig::default();
        assert!(config.refresh_interval_secs * 2 <= config.lease_ttl_secs);
    }
}
