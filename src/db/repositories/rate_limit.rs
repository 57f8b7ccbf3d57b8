use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, rate_limits};

pub struct RateLimitRepository {
    conn: DatabaseConnection,
}

impl RateLimitRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Counts one request against the (`api_key_id`, `window_start`) bucket and
    /// returns the bucket's new total. Insert-or-increment and the read-back
    /// share one `RETURNING` statement, so each caller sees its own count.
    pub async fn hit(&self, api_key_id: &str, window_start: i64) -> Result<i64> {
        let model = rate_limits::ActiveModel {
            api_key_id: Set(api_key_id.to_string()),
            window_start: Set(window_start),
            request_count: Set(1),
        };

        let row = RateLimits::insert(model)
            .on_conflict(
                OnConflict::columns([
                    rate_limits::Column::ApiKeyId,
                    rate_limits::Column::WindowStart,
                ])
                .value(
                    rate_limits::Column::RequestCount,
                    Expr::col((RateLimits, rate_limits::Column::RequestCount)).add(1),
                )
                .to_owned(),
            )
            .exec_with_returning(&self.conn)
            .await
            .context("Failed to increment rate limit window")?;

        Ok(row.request_count)
    }

    /// Deletes windows that started before `cutoff` (unix seconds).
    pub async fn prune_before(&self, cutoff: i64) -> Result<u64> {
        let result = RateLimits::delete_many()
            .filter(rate_limits::Column::WindowStart.lt(cutoff))
            .exec(&self.conn)
            .await
            .context("Failed to prune rate limit windows")?;

        Ok(result.rows_affected)
    }
}
