//! Postgres-backed repositories, one struct per aggregate, each wrapping
//! a shared [`sqlx::PgPool`] the way the teacher's platform repositories
//! wrap a MongoDB collection handle.

pub mod channel_repo;
pub mod content_repo;
pub mod error;
pub mod frontier_repo;
pub mod job_repo;
pub mod source_repo;
pub mod standby_repo;

pub use channel_repo::{ChannelRepository, RouteRepository, PublishHistoryRepository};
pub use content_repo::ContentRepository;
pub use error::{Result, StorageError};
pub use frontier_repo::{DiscoveredLinkRepository, FeedStateRepository, FrontierRepository, HostStateRepository};
pub use job_repo::{JobExecutionRepository, JobRepository, ProcessedEventRepository};
pub use source_repo::SourceRepository;
pub use standby_repo::LeaderLeaseRepository;

use sqlx::postgres::{PgPoolOptions, PgPool};

/// Opens a Postgres connection pool and runs embedded migrations.
/// Every binary in this workspace calls this once at startup.
pub async fn connect(database_url: &str, max_connections: u32, min_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
