//! Credit metering for paid endpoints.
//!
//! A metered request first reserves its cost with a single conditional update.
//! A successful response keeps the reservation and appends a usage log row;
//! any other outcome refunds it.

use std::time::Duration;

use tracing::{error, warn};

use crate::db::{NewUsage, Store};
use crate::models::account::{AccountContext, Reservation};

#[derive(Debug, thiserror::Error)]
pub enum MeteringError {
    #[error("Need {needed} credits, have {remaining}")]
    InsufficientCredits { needed: i64, remaining: i64 },

    #[error("Credit ledger unavailable: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct CreditLedger {
    store: Store,
}

impl CreditLedger {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Holds `cost` credits against the account. Refused without side effects
    /// when the balance cannot cover it.
    pub async fn reserve(
        &self,
        account: &AccountContext,
        endpoint: &str,
        cost: i64,
    ) -> Result<Reservation, MeteringError> {
        let limit = account.credit_limit();

        if cost > 0 {
            let reserved = self
                .store
                .reserve_credits(&account.user_id, cost, limit)
                .await?;

            if !reserved {
                let used = self
                    .store
                    .get_profile(&account.user_id)
                    .await?
                    .map_or(account.credits_used, |p| p.credits_used);

                metrics::counter!("credits_refused_total", "endpoint" => endpoint.to_string())
                    .increment(1);

                return Err(MeteringError::InsufficientCredits {
                    needed: cost,
                    remaining: account.plan.credits_remaining(used).unwrap_or(0),
                });
            }
        }

        let credits_used_after = if cost > 0 {
            self.store
                .get_profile(&account.user_id)
                .await?
                .map_or(account.credits_used + cost, |p| p.credits_used)
        } else {
            account.credits_used
        };

        Ok(Reservation {
            user_id: account.user_id.clone(),
            api_key_id: account.api_key_id.clone(),
            endpoint: endpoint.to_string(),
            cost,
            plan: account.plan,
            credits_used_after,
        })
    }

    /// Keeps the reservation and records the call.
    pub async fn settle(&self, reservation: &Reservation, status_code: u16, elapsed: Duration) {
        let entry = NewUsage {
            api_key_id: &reservation.api_key_id,
            user_id: &reservation.user_id,
            endpoint: &reservation.endpoint,
            credits_used: reservation.cost,
            status_code,
            response_time_ms: i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        };

        if let Err(e) = self.store.record_usage(&entry).await {
            error!(error = %e, endpoint = %reservation.endpoint, "Failed to record usage");
        }

        if reservation.cost > 0 {
            metrics::counter!("credits_debited_total", "endpoint" => reservation.endpoint.clone())
                .increment(reservation.cost.unsigned_abs());
        }
    }

    /// Returns the reserved credits after a failed request.
    pub async fn refund(&self, reservation: &Reservation) {
        if reservation.cost == 0 {
            return;
        }

        match self
            .store
            .refund_credits(&reservation.user_id, reservation.cost)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                user_id = %reservation.user_id,
                cost = reservation.cost,
                "Refund skipped, balance already below reserved amount"
            ),
            Err(e) => error!(error = %e, user_id = %reservation.user_id, "Failed to refund credits"),
        }
    }
}
