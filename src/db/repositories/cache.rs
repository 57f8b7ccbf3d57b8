use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::entities::{cached_results, prelude::*};
use crate::models::format_timestamp;

pub struct CacheRepository {
    conn: DatabaseConnection,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Returns the cached value for `cache_key` unless it has expired.
    /// Rows that no longer deserialize are treated as misses.
    pub async fn get<T: DeserializeOwned>(&self, cache_key: &str) -> Result<Option<T>> {
        let now = format_timestamp(Utc::now());

        let entry = CachedResults::find_by_id(cache_key.to_string())
            .filter(cached_results::Column::ExpiresAt.gt(now))
            .one(&self.conn)
            .await
            .context("Failed to query cached result")?;

        Ok(entry.and_then(|e| serde_json::from_str(&e.result).ok()))
    }

    pub async fn put<T: Serialize + Sync>(
        &self,
        cache_key: &str,
        endpoint: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let now = Utc::now();
        let model = cached_results::ActiveModel {
            cache_key: Set(cache_key.to_string()),
            endpoint: Set(endpoint.to_string()),
            result: Set(serde_json::to_string(value)?),
            created_at: Set(format_timestamp(now)),
            expires_at: Set(format_timestamp(now + ttl)),
        };

        CachedResults::insert(model)
            .on_conflict(
                OnConflict::column(cached_results::Column::CacheKey)
                    .update_columns([
                        cached_results::Column::Endpoint,
                        cached_results::Column::Result,
                        cached_results::Column::CreatedAt,
                        cached_results::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to store cached result")?;

        Ok(())
    }

    pub async fn prune_expired(&self) -> Result<u64> {
        let now = format_timestamp(Utc::now());

        let result = CachedResults::delete_many()
            .filter(cached_results::Column::ExpiresAt.lte(now))
            .exec(&self.conn)
            .await
            .context("Failed to prune cached results")?;

        Ok(result.rows_affected)
    }
}
