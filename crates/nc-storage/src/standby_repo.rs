//! Leader-lease repository backing `nc-standby`'s Postgres-CAS election.
//!
//! Grounded on the teacher's Redis `SET NX EX` / Lua check-and-extend
//! leader election (`fc-standby::leader`), re-expressed as row CAS per
//! the Open Question decision in `DESIGN.md`: durable tables, not Redis,
//! are the single source of truth for cross-process coordination here.

use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct LeaderLeaseRepository {
    pool: PgPool,
}

impl LeaderLeaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Acquires the named lease for `holder` if it is unheld or expired.
    /// Equivalent to `SET NX EX`: succeeds only when no live holder
    /// exists, and is safe under concurrent callers because the whole
    /// thing is one `INSERT ... ON CONFLICT ... WHERE` statement.
    pub async fn try_acquire(&self, lease_name: &str, holder: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO leader_lease (lease_name, holder, expires_at) VALUES ($1, $2, $3)
             ON CONFLICT (lease_name) DO UPDATE
                SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at
                WHERE leader_lease.expires_at < now()",
        )
        .bind(lease_name)
        .bind(holder)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Extends a lease this instance already holds. Equivalent to the
    /// teacher's Lua check-and-extend script: the `WHERE holder = $2`
    /// predicate makes the compare-and-set atomic against a split-brain
    /// competitor that raced in after this instance's lease lapsed.
    pub async fn try_extend(&self, lease_name: &str, holder: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE leader_lease SET expires_at = $3 WHERE lease_name = $1 AND holder = $2",
        )
        .bind(lease_name)
        .bind(holder)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Releases a lease this instance holds, e.g. on graceful shutdown.
    pub async fn release(&self, lease_name: &str, holder: &str) -> Result<()> {
        sqlx::query("DELETE FROM leader_lease WHERE lease_name = $1 AND holder = $2")
            .bind(lease_name)
            .bind(holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn current_holder(&self, lease_name: &str) -> Result<Option<(String, DateTime<Utc>)>> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT holder, expires_at FROM leader_lease WHERE lease_name = $1",
        )
        .bind(lease_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
