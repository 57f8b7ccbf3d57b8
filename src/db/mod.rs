use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

use crate::models::plan::PlanId;

pub mod migrator;
pub mod repositories;

pub use crate::entities::api_keys::Model as ApiKey;
pub use crate::entities::profiles::Model as Profile;
pub use crate::entities::usage_logs::Model as UsageLog;
pub use repositories::usage::NewUsage;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if let Some(path_str) = db_url.strip_prefix("sqlite:")
            && !in_memory
        {
            let path_str = path_str.trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(std::time::Duration::from_secs(10))
            .acquire_timeout(std::time::Duration::from_secs(10))
            .sqlx_logging(false);

        // Every pooled connection to an in-memory SQLite database sees its own
        // empty database, so those pools are pinned to a single connection.
        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(std::time::Duration::from_secs(300))
                .max_lifetime(std::time::Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn profile_repo(&self) -> repositories::profile::ProfileRepository {
        repositories::profile::ProfileRepository::new(self.conn.clone())
    }

    fn api_key_repo(&self) -> repositories::api_key::ApiKeyRepository {
        repositories::api_key::ApiKeyRepository::new(self.conn.clone())
    }

    fn usage_repo(&self) -> repositories::usage::UsageRepository {
        repositories::usage::UsageRepository::new(self.conn.clone())
    }

    fn rate_limit_repo(&self) -> repositories::rate_limit::RateLimitRepository {
        repositories::rate_limit::RateLimitRepository::new(self.conn.clone())
    }

    fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone())
    }

    // Profiles

    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        self.profile_repo().get(id).await
    }

    pub async fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        self.profile_repo().get_by_email(email).await
    }

    pub async fn create_profile(
        &self,
        email: &str,
        name: Option<&str>,
        reset_at: DateTime<Utc>,
    ) -> Result<Profile> {
        self.profile_repo().create(email, name, reset_at).await
    }

    pub async fn reset_credits(
        &self,
        id: &str,
        seen_reset_at: &str,
        next_reset_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.profile_repo()
            .reset_credits(id, seen_reset_at, next_reset_at)
            .await
    }

    pub async fn reserve_credits(&self, id: &str, amount: i64, limit: Option<i64>) -> Result<bool> {
        self.profile_repo().reserve_credits(id, amount, limit).await
    }

    pub async fn refund_credits(&self, id: &str, amount: i64) -> Result<bool> {
        self.profile_repo().refund_credits(id, amount).await
    }

    pub async fn set_stripe_customer(&self, id: &str, customer_id: &str) -> Result<()> {
        self.profile_repo()
            .set_stripe_customer(id, customer_id)
            .await
    }

    pub async fn activate_subscription(
        &self,
        id: &str,
        plan: PlanId,
        subscription_id: Option<&str>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.profile_repo()
            .activate_subscription(id, plan, subscription_id, next_reset_at)
            .await
    }

    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<u64> {
        self.profile_repo()
            .cancel_subscription(subscription_id)
            .await
    }

    // API keys

    pub async fn find_active_api_key(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        self.api_key_repo().find_active_by_hash(key_hash).await
    }

    pub async fn find_active_key_for_user(&self, user_id: &str) -> Result<Option<ApiKey>> {
        self.api_key_repo().find_active_for_user(user_id).await
    }

    pub async fn list_api_keys(&self, user_id: &str) -> Result<Vec<ApiKey>> {
        self.api_key_repo().list_for_user(user_id).await
    }

    pub async fn create_api_key(&self, user_id: &str, name: &str) -> Result<(ApiKey, String)> {
        self.api_key_repo().create(user_id, name).await
    }

    pub async fn revoke_api_key(&self, user_id: &str, key_id: &str) -> Result<bool> {
        self.api_key_repo().revoke(user_id, key_id).await
    }

    pub async fn touch_api_key(&self, key_id: &str) -> Result<()> {
        self.api_key_repo().touch(key_id).await
    }

    // Usage

    pub async fn record_usage(&self, entry: &NewUsage<'_>) -> Result<()> {
        self.usage_repo().record(entry).await
    }

    pub async fn recent_usage(&self, user_id: &str, limit: u64) -> Result<Vec<UsageLog>> {
        self.usage_repo().recent_for_user(user_id, limit).await
    }

    pub async fn count_usage_since(&self, user_id: &str, since: &str) -> Result<u64> {
        self.usage_repo().count_since(user_id, since).await
    }

    // Rate limiting

    pub async fn hit_rate_limit(&self, api_key_id: &str, window_start: i64) -> Result<i64> {
        self.rate_limit_repo().hit(api_key_id, window_start).await
    }

    pub async fn prune_rate_limits(&self, cutoff: i64) -> Result<u64> {
        self.rate_limit_repo().prune_before(cutoff).await
    }

    // Result cache

    pub async fn get_cached<T: DeserializeOwned>(&self, cache_key: &str) -> Result<Option<T>> {
        self.cache_repo().get(cache_key).await
    }

    pub async fn put_cached<T: Serialize + Sync>(
        &self,
        cache_key: &str,
        endpoint: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        self.cache_repo().put(cache_key, endpoint, value, ttl).await
    }

    pub async fn prune_cache(&self) -> Result<u64> {
        self.cache_repo().prune_expired().await
    }
}
