//! Plan upgrades through hosted checkout, and the payment webhook that applies
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::stripe::{CheckoutRequest, GatewayError};
use crate::clients::{NotifyLevel, PaymentGateway, TelegramNotifier};
use crate::config::StripeConfig;
use crate::constants::billing;
use crate::db::Store;
use crate::models::account::AccountContext;
use crate::models::plan::PlanId;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Plan must be \"pro\" or \"scale\"")]
    InvalidPlan,

    #[error("{0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub checkout_url: String,
    pub plan: PlanId,
    pub price: String,
}

/// What a webhook event did to stored profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    PlanActivated { user_id: String, plan: PlanId },
    SubscriptionCancelled { profiles: u64 },
    Ignored,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletedSession {
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct DeletedSubscription {
    id: String,
}

type HmacSha256 = Hmac<Sha256>;

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// e.g. `1,000 API credits/month`
fn product_description(plan: PlanId) -> String {
    plan.credit_limit().map_or_else(
        || "Unlimited API credits".to_string(),
        |limit| format!("{} API credits/month", group_thousands(limit)),
    )
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw payload. The timestamp must be within `tolerance_seconds` of `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_seconds: i64,
) -> Result<(), BillingError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(BillingError::InvalidSignature)?;
    if now.abs_diff(timestamp) > tolerance_seconds.unsigned_abs() {
        return Err(BillingError::InvalidSignature);
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| BillingError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(BillingError::InvalidSignature)
}

pub struct BillingService {
    store: Store,
    gateway: Arc<dyn PaymentGateway>,
    notifier: TelegramNotifier,
    config: StripeConfig,
}

impl BillingService {
    #[must_use]
    pub fn new(
        store: Store,
        gateway: Arc<dyn PaymentGateway>,
        notifier: TelegramNotifier,
        config: StripeConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            config,
        }
    }

    /// Starts a hosted subscription checkout for `plan`, creating the payment
    /// customer on first use.
    pub async fn checkout(
        &self,
        account: &AccountContext,
        plan: PlanId,
    ) -> Result<CheckoutResult, BillingError> {
        let amount = plan
            .price_cents()
            .filter(|_| plan.is_purchasable())
            .ok_or(BillingError::InvalidPlan)?;

        let profile = self
            .store
            .get_profile(&account.user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("profile {} disappeared", account.user_id))?;

        let customer_id = if let Some(id) = profile.stripe_customer_id.clone() {
            id
        } else {
            let id = self
                .gateway
                .create_customer(&profile.email, &profile.id)
                .await?;
            self.store.set_stripe_customer(&profile.id, &id).await?;
            id
        };

        let product_name = format!("AgenticPencil {}", plan.display_name());
        let description = product_description(plan);
        let plan_str = plan.as_str();

        let session = self
            .gateway
            .create_checkout_session(&CheckoutRequest {
                customer_id: &customer_id,
                user_id: &profile.id,
                plan: plan_str,
                product_name: &product_name,
                description: &description,
                unit_amount_cents: amount,
                success_url: &self.config.success_url,
                cancel_url: &self.config.cancel_url,
            })
            .await?;

        info!(user_id = %profile.id, plan = plan_str, session_id = %session.id, "Checkout session created");

        Ok(CheckoutResult {
            checkout_url: session.url,
            plan,
            price: format!("${}/month", amount / 100),
        })
    }

    /// Verifies (when a secret is configured) and applies a webhook payload.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, BillingError> {
        if let Some(secret) = self.config.webhook_secret.as_deref() {
            let header = signature.ok_or(BillingError::InvalidSignature)?;
            verify_signature(
                payload,
                header,
                secret,
                Utc::now().timestamp(),
                self.config.webhook_tolerance_seconds,
            )?;
        }

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;

        match event.event_type.as_str() {
            "checkout.session.completed" => self.apply_completed_checkout(event.data.object).await,
            "customer.subscription.deleted" => {
                let subscription: DeletedSubscription = serde_json::from_value(event.data.object)
                    .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;
                let profiles = self.store.cancel_subscription(&subscription.id).await?;

                info!(subscription_id = %subscription.id, profiles, "Subscription cancelled");
                self.notifier.notify_detached(
                    NotifyLevel::Warn,
                    "Subscription cancelled".to_string(),
                    vec![("subscription", subscription.id)],
                );

                Ok(WebhookOutcome::SubscriptionCancelled { profiles })
            }
            other => {
                info!(event_type = other, "Ignoring webhook event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn apply_completed_checkout(
        &self,
        object: serde_json::Value,
    ) -> Result<WebhookOutcome, BillingError> {
        let session: CompletedSession = serde_json::from_value(object)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;
        let metadata = session.metadata.unwrap_or_default();

        let (Some(user_id), Some(plan)) = (metadata.get("user_id"), metadata.get("plan")) else {
            warn!("Checkout completed without user metadata");
            return Ok(WebhookOutcome::Ignored);
        };

        let Ok(plan) = plan.parse::<PlanId>() else {
            warn!(plan = %plan, "Checkout completed for unknown plan");
            return Ok(WebhookOutcome::Ignored);
        };

        let next_reset = Utc::now() + Duration::days(billing::CREDIT_WINDOW_DAYS);
        let updated = self
            .store
            .activate_subscription(user_id, plan, session.subscription.as_deref(), next_reset)
            .await?;

        if !updated {
            warn!(user_id = %user_id, "Checkout completed for unknown profile");
            return Ok(WebhookOutcome::Ignored);
        }

        info!(user_id = %user_id, plan = %plan, "Plan activated");
        self.notifier.notify_detached(
            NotifyLevel::Info,
            "Plan upgraded".to_string(),
            vec![("user", user_id.clone()), ("plan", plan.to_string())],
        );

        Ok(WebhookOutcome::PlanActivated {
            user_id: user_id.clone(),
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_product_description() {
        assert_eq!(product_description(PlanId::Pro), "1,000 API credits/month");
        assert_eq!(product_description(PlanId::Scale), "5,000 API credits/month");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(999), "999");
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"ping"}"#;
        let header = format!("t=1700000000,v1={}", sign(payload, "whsec", 1_700_000_000));

        assert!(verify_signature(payload, &header, "whsec", 1_700_000_100, 300).is_ok());
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let payload = b"{}";
        let header = format!(
            "t=1700000000, v1=deadbeef, v0=ignored, v1={}",
            sign(payload, "whsec", 1_700_000_000)
        );

        assert!(verify_signature(payload, &header, "whsec", 1_700_000_000, 300).is_ok());
    }

    #[test]
    fn test_rejects_wrong_secret_or_tampered_body() {
        let payload = b"{\"a\":1}";
        let header = format!("t=1700000000,v1={}", sign(payload, "whsec", 1_700_000_000));

        assert!(verify_signature(payload, &header, "other", 1_700_000_000, 300).is_err());
        assert!(verify_signature(b"{\"a\":2}", &header, "whsec", 1_700_000_000, 300).is_err());
    }

    #[test]
    fn test_rejects_stale_timestamp() {
        let payload = b"{}";
        let header = format!("t=1700000000,v1={}", sign(payload, "whsec", 1_700_000_000));

        assert!(verify_signature(payload, &header, "whsec", 1_700_000_301, 300).is_err());
    }

    #[test]
    fn test_rejects_extreme_timestamps() {
        let payload = b"{}";
        let now = 1_700_000_000;

        for header in [
            "t=-9223372036854775000,v1=00",
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert!(matches!(
                verify_signature(payload, header, "whsec", now, 300),
                Err(BillingError::InvalidSignature)
            ));
        }

        let header = format!("t={},v1={}", i64::MIN, sign(payload, "whsec", i64::MIN));
        assert!(verify_signature(payload, &header, "whsec", i64::MAX, 300).is_err());
    }

    #[test]
    fn test_rejects_malformed_header() {
        assert!(verify_signature(b"{}", "garbage", "whsec", 0, 300).is_err());
        assert!(verify_signature(b"{}", "t=abc,v1=00", "whsec", 0, 300).is_err());
    }
}
