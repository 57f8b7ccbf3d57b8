//! Accounts and API keys: self-registration, key management and bearer-key
//! authentication.

use chrono::{Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::{NotifyLevel, TelegramNotifier};
use crate::constants::{billing, keys};
use crate::db::repositories::api_key::hash_api_key;
use crate::db::{ApiKey, Profile, Store};
use crate::models::account::AccountContext;
use crate::models::parse_timestamp;
use crate::models::plan::PlanId;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid API key format. Keys start with \"ap_\"")]
    MalformedKey,

    #[error("Invalid or revoked API key")]
    InvalidKey,

    #[error("User not found")]
    UserNotFound,

    #[error("Account exists. Key prefix: {0}. If lost, contact support.")]
    AlreadyExists(String),

    #[error("API key not found")]
    KeyNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Returned once at key creation. The plaintext is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedKey {
    pub id: String,
    pub api_key: String,
    pub key_prefix: String,
    pub name: String,
    pub warning: &'static str,
}

impl IssuedKey {
    fn new(row: ApiKey, plaintext: String) -> Self {
        Self {
            id: row.id,
            api_key: plaintext,
            key_prefix: row.key_prefix,
            name: row.name,
            warning: "Save this key. It cannot be retrieved again.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub key: IssuedKey,
    pub plan: PlanId,
    pub credits: Option<i64>,
    pub rate_limit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeySummary {
    pub id: String,
    pub key_prefix: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub revoked_at: Option<String>,
}

impl From<ApiKey> for KeySummary {
    fn from(row: ApiKey) -> Self {
        Self {
            id: row.id,
            key_prefix: row.key_prefix,
            name: row.name,
            is_active: row.is_active && row.revoked_at.is_none(),
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            revoked_at: row.revoked_at,
        }
    }
}

/// Minimal structural check: one `@`, non-empty local part, dotted domain.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn key_name(name: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(keys::DEFAULT_NAME)
        .chars()
        .take(100)
        .collect()
}

#[derive(Clone)]
pub struct AccountService {
    store: Store,
    notifier: TelegramNotifier,
}

impl AccountService {
    #[must_use]
    pub const fn new(store: Store, notifier: TelegramNotifier) -> Self {
        Self { store, notifier }
    }

    /// Creates a free-plan profile (or reuses a key-less one) and issues its
    /// first API key.
    pub async fn register(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<Registration, AccountError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AccountError::Validation("a valid email is required".to_string()));
        }

        let profile = match self.store.get_profile_by_email(&email).await? {
            Some(existing) => {
                if let Some(key) = self.store.find_active_key_for_user(&existing.id).await? {
                    return Err(AccountError::AlreadyExists(key.key_prefix));
                }
                existing
            }
            None => {
                let reset_at = Utc::now() + Duration::days(billing::CREDIT_WINDOW_DAYS);
                self.store.create_profile(&email, name, reset_at).await?
            }
        };

        let (row, plaintext) = self
            .store
            .create_api_key(&profile.id, &key_name(name))
            .await?;

        info!(user_id = %profile.id, key_prefix = %row.key_prefix, "Account registered");
        self.notifier.notify_detached(
            NotifyLevel::Signup,
            "New API signup".to_string(),
            vec![("email", email.clone()), ("plan", profile.plan_id.clone())],
        );

        let plan = PlanId::from_stored(&profile.plan_id);
        Ok(Registration {
            key: IssuedKey::new(row, plaintext),
            plan,
            credits: plan.credit_limit(),
            rate_limit: format!("{} requests/minute", plan.rate_limit()),
        })
    }

    /// Operator path: issue a key for `email`, creating the profile if needed.
    pub async fn issue_key_for_email(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<IssuedKey, AccountError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AccountError::Validation("a valid email is required".to_string()));
        }

        let profile = if let Some(existing) = self.store.get_profile_by_email(&email).await? {
            existing
        } else {
            let reset_at = Utc::now() + Duration::days(billing::CREDIT_WINDOW_DAYS);
            self.store.create_profile(&email, None, reset_at).await?
        };

        self.create_key(&profile.id, name).await
    }

    pub async fn create_key(
        &self,
        user_id: &str,
        name: Option<&str>,
    ) -> Result<IssuedKey, AccountError> {
        let (row, plaintext) = self.store.create_api_key(user_id, &key_name(name)).await?;
        info!(user_id, key_prefix = %row.key_prefix, "API key created");
        Ok(IssuedKey::new(row, plaintext))
    }

    pub async fn list_keys(&self, user_id: &str) -> Result<Vec<KeySummary>, AccountError> {
        let rows = self.store.list_api_keys(user_id).await?;
        Ok(rows.into_iter().map(KeySummary::from).collect())
    }

    pub async fn revoke_key(&self, user_id: &str, key_id: &str) -> Result<(), AccountError> {
        if self.store.revoke_api_key(user_id, key_id).await? {
            info!(user_id, key_id, "API key revoked");
            Ok(())
        } else {
            Err(AccountError::KeyNotFound)
        }
    }

    pub async fn profile(&self, user_id: &str) -> Result<Profile, AccountError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    /// Resolves a bearer token to its account. Starts a new billing window
    /// when the current one has elapsed.
    pub async fn authenticate(&self, token: &str) -> Result<AccountContext, AccountError> {
        if !token.starts_with(keys::PREFIX) {
            return Err(AccountError::MalformedKey);
        }

        let key = self
            .store
            .find_active_api_key(&hash_api_key(token))
            .await?
            .ok_or(AccountError::InvalidKey)?;

        let mut profile = self.profile(&key.user_id).await?;

        let now = Utc::now();
        let window_elapsed =
            parse_timestamp(&profile.credits_reset_at).is_none_or(|reset_at| reset_at <= now);

        if window_elapsed {
            let next = now + Duration::days(billing::CREDIT_WINDOW_DAYS);
            if self
                .store
                .reset_credits(&profile.id, &profile.credits_reset_at, next)
                .await?
            {
                info!(user_id = %profile.id, "Credit window reset");
            }
            profile = self.profile(&key.user_id).await?;
        }

        let store = self.store.clone();
        let key_id = key.id.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_api_key(&key_id).await {
                warn!(error = %e, key_id = %key_id, "Failed to update key last_used_at");
            }
        });

        Ok(AccountContext {
            user_id: profile.id,
            api_key_id: key.id,
            plan: PlanId::from_stored(&profile.plan_id),
            credits_used: profile.credits_used,
            credits_reset_at: profile.credits_reset_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("dev@example.com"));
        assert!(is_valid_email("a.b+tag@sub.example.io"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dev@localhost"));
        assert!(!is_valid_email("dev@@example.com"));
        assert!(!is_valid_email("dev @example.com"));
        assert!(!is_valid_email("dev@example."));
    }

    #[test]
    fn test_key_name_defaults_and_truncates() {
        assert_eq!(key_name(None), "Default");
        assert_eq!(key_name(Some("   ")), "Default");
        assert_eq!(key_name(Some(" ci ")), "ci");
        assert_eq!(key_name(Some(&"x".repeat(300))).len(), 100);
    }
}
