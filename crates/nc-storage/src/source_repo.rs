//! Source repository. Sources are operator-owned via the admin API.

use crate::error::{Result, StorageError};
use nc_domain::Source;
use sqlx::PgPool;
use uuid::Uuid;

pub struct SourceRepository {
    pool: PgPool,
}

impl SourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, source: &Source) -> Result<()> {
        sqlx::query(
            "INSERT INTO sources (id, name, seed_url, allowed_domains, selectors, rate_limit_ms, max_depth, enabled, index_names)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(source.id)
        .bind(&source.name)
        .bind(&source.seed_url)
        .bind(&source.allowed_domains)
        .bind(sqlx::types::Json(&source.selectors))
        .bind(source.rate_limit_ms)
        .bind(source.max_depth)
        .bind(source.enabled)
        .bind(&source.index_names)
        .execute(&self.pool)
        .await
        .map_err(translate_insert_error("Source", "id"))?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Source>> {
        let source = sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(source)
    }

    pub async fn list(&self, enabled_only: bool) -> Result<Vec<Source>> {
        let sources = if enabled_only {
            sqlx::query_as::<_, Source>("SELECT * FROM sources WHERE enabled = true ORDER BY name")
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_as::<_, Source>("SELECT * FROM sources ORDER BY name")
                .fetch_all(&self.pool)
                .await?
        };
        Ok(sources)
    }

    pub async fn update(&self, source: &Source) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sources SET name = $2, seed_url = $3, allowed_domains = $4, selectors = $5,
             rate_limit_ms = $6, max_depth = $7, enabled = $8, index_names = $9 WHERE id = $1",
        )
        .bind(source.id)
        .bind(&source.name)
        .bind(&source.seed_url)
        .bind(&source.allowed_domains)
        .bind(sqlx::types::Json(&source.selectors))
        .bind(source.rate_limit_ms)
        .bind(source.max_depth)
        .bind(source.enabled)
        .bind(&source.index_names)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Source", source.id.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Source", id.to_string()));
        }
        Ok(())
    }
}

/// Maps a unique-constraint violation on `insert` into a domain-typed
/// `Duplicate` error instead of leaking the raw Postgres error.
pub(crate) fn translate_insert_error(
    entity_type: &'static str,
    field: &'static str,
) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |e| {
        let err = StorageError::from(e);
        if err.is_unique_violation() {
            StorageError::Duplicate {
                entity_type: entity_type.to_string(),
                field: field.to_string(),
                value: String::new(),
            }
        } else {
            err
        }
    }
}
