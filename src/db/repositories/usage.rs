use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{prelude::*, usage_logs};
use crate::models::format_timestamp;

/// A completed metered call, ready to be appended to the usage log.
#[derive(Debug, Clone)]
pub struct NewUsage<'a> {
    pub api_key_id: &'a str,
    pub user_id: &'a str,
    pub endpoint: &'a str,
    pub credits_used: i64,
    pub status_code: u16,
    pub response_time_ms: i64,
}

pub struct UsageRepository {
    conn: DatabaseConnection,
}

impl UsageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(&self, entry: &NewUsage<'_>) -> Result<()> {
        let model = usage_logs::ActiveModel {
            api_key_id: Set(entry.api_key_id.to_string()),
            user_id: Set(entry.user_id.to_string()),
            endpoint: Set(entry.endpoint.to_string()),
            credits_used: Set(entry.credits_used),
            status_code: Set(i32::from(entry.status_code)),
            response_time_ms: Set(entry.response_time_ms),
            created_at: Set(format_timestamp(Utc::now())),
            ..Default::default()
        };

        UsageLogs::insert(model)
            .exec(&self.conn)
            .await
            .context("Failed to record usage")?;

        Ok(())
    }

    pub async fn recent_for_user(&self, user_id: &str, limit: u64) -> Result<Vec<usage_logs::Model>> {
        UsageLogs::find()
            .filter(usage_logs::Column::UserId.eq(user_id))
            .order_by_desc(usage_logs::Column::CreatedAt)
            .order_by_desc(usage_logs::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query recent usage")
    }

    /// Number of logged calls at or after `since` (RFC 3339).
    pub async fn count_since(&self, user_id: &str, since: &str) -> Result<u64> {
        UsageLogs::find()
            .filter(usage_logs::Column::UserId.eq(user_id))
            .filter(usage_logs::Column::CreatedAt.gte(since))
            .count(&self.conn)
            .await
            .context("Failed to count usage")
    }
}
