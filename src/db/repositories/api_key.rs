use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use sha2::{Digest, Sha256};

use crate::constants::keys;
use crate::entities::{api_keys, prelude::*};
use crate::models::format_timestamp;

/// Mints a new plaintext key: `ap_` followed by 32 hex characters.
#[must_use]
pub fn generate_api_key() -> String {
    let bytes: [u8; keys::RANDOM_BYTES] = rand::rng().random();
    format!("{}{}", keys::PREFIX, hex::encode(bytes))
}

/// Keys are stored and looked up by their SHA-256 digest only.
#[must_use]
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[must_use]
pub fn display_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(keys::DISPLAY_PREFIX_LEN).collect();
    format!("{prefix}...")
}

pub struct ApiKeyRepository {
    conn: DatabaseConnection,
}

impl ApiKeyRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<api_keys::Model>> {
        ApiKeys::find()
            .filter(api_keys::Column::KeyHash.eq(key_hash))
            .filter(api_keys::Column::IsActive.eq(true))
            .filter(api_keys::Column::RevokedAt.is_null())
            .one(&self.conn)
            .await
            .context("Failed to query API key by hash")
    }

    pub async fn find_active_for_user(&self, user_id: &str) -> Result<Option<api_keys::Model>> {
        ApiKeys::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .filter(api_keys::Column::IsActive.eq(true))
            .filter(api_keys::Column::RevokedAt.is_null())
            .one(&self.conn)
            .await
            .context("Failed to query active API key")
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<api_keys::Model>> {
        ApiKeys::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .order_by_asc(api_keys::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list API keys")
    }

    /// Stores a freshly minted key and returns the row with the plaintext.
    /// The plaintext is not recoverable afterwards.
    pub async fn create(&self, user_id: &str, name: &str) -> Result<(api_keys::Model, String)> {
        let plaintext = generate_api_key();

        let model = api_keys::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            key_hash: Set(hash_api_key(&plaintext)),
            key_prefix: Set(display_prefix(&plaintext)),
            name: Set(name.to_string()),
            is_active: Set(true),
            revoked_at: Set(None),
            last_used_at: Set(None),
            created_at: Set(format_timestamp(Utc::now())),
        };

        let row = ApiKeys::insert(model)
            .exec_with_returning(&self.conn)
            .await
            .context("Failed to create API key")?;

        Ok((row, plaintext))
    }

    /// Revokes one of `user_id`'s keys. Returns false if no such active key exists.
    pub async fn revoke(&self, user_id: &str, key_id: &str) -> Result<bool> {
        let result = ApiKeys::update_many()
            .col_expr(api_keys::Column::IsActive, Expr::value(false))
            .col_expr(
                api_keys::Column::RevokedAt,
                Expr::value(Some(format_timestamp(Utc::now()))),
            )
            .filter(api_keys::Column::Id.eq(key_id))
            .filter(api_keys::Column::UserId.eq(user_id))
            .filter(api_keys::Column::IsActive.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to revoke API key")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn touch(&self, key_id: &str) -> Result<()> {
        ApiKeys::update_many()
            .col_expr(
                api_keys::Column::LastUsedAt,
                Expr::value(Some(format_timestamp(Utc::now()))),
            )
            .filter(api_keys::Column::Id.eq(key_id))
            .exec(&self.conn)
            .await
            .context("Failed to update API key last_used_at")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with("ap_"));
        assert_eq!(key.len(), 35);
        assert!(key[3..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn test_hash_is_stable_sha256_hex() {
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_api_key("ap_x"), hash_api_key("ap_x"));
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(
            display_prefix("ap_0123456789abcdef0123456789abcdef"),
            "ap_012345678..."
        );
    }
}
