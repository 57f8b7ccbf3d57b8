use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{prelude::*, profiles};
use crate::models::format_timestamp;
use crate::models::plan::PlanId;

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: &str) -> Result<Option<profiles::Model>> {
        Profiles::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query profile by id")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<profiles::Model>> {
        Profiles::find()
            .filter(profiles::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query profile by email")
    }

    pub async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        reset_at: DateTime<Utc>,
    ) -> Result<profiles::Model> {
        let model = profiles::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(email.to_string()),
            name: Set(name.map(str::to_string)),
            plan_id: Set(PlanId::Free.as_str().to_string()),
            credits_used: Set(0),
            credits_reset_at: Set(format_timestamp(reset_at)),
            stripe_customer_id: Set(None),
            stripe_subscription_id: Set(None),
            created_at: Set(format_timestamp(Utc::now())),
        };

        Profiles::insert(model)
            .exec_with_returning(&self.conn)
            .await
            .context("Failed to create profile")
    }

    /// Zeroes the balance and moves the window forward, but only if the
    /// stored window has not already been advanced by a concurrent request.
    pub async fn reset_credits(
        &self,
        id: &str,
        seen_reset_at: &str,
        next_reset_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = Profiles::update_many()
            .col_expr(profiles::Column::CreditsUsed, Expr::value(0i64))
            .col_expr(
                profiles::Column::CreditsResetAt,
                Expr::value(format_timestamp(next_reset_at)),
            )
            .filter(profiles::Column::Id.eq(id))
            .filter(profiles::Column::CreditsResetAt.eq(seen_reset_at))
            .exec(&self.conn)
            .await
            .context("Failed to reset credits")?;

        Ok(result.rows_affected > 0)
    }

    /// Atomically adds `amount` to the balance if the result stays within
    /// `limit`. Returns false when the reservation was refused.
    pub async fn reserve_credits(&self, id: &str, amount: i64, limit: Option<i64>) -> Result<bool> {
        let mut update = Profiles::update_many()
            .col_expr(
                profiles::Column::CreditsUsed,
                Expr::col(profiles::Column::CreditsUsed).add(amount),
            )
            .filter(profiles::Column::Id.eq(id));

        if let Some(limit) = limit {
            update = update.filter(profiles::Column::CreditsUsed.lte(limit - amount));
        }

        let result = update
            .exec(&self.conn)
            .await
            .context("Failed to reserve credits")?;

        Ok(result.rows_affected > 0)
    }

    /// Returns previously reserved credits. The balance never drops below zero.
    pub async fn refund_credits(&self, id: &str, amount: i64) -> Result<bool> {
        let result = Profiles::update_many()
            .col_expr(
                profiles::Column::CreditsUsed,
                Expr::col(profiles::Column::CreditsUsed).sub(amount),
            )
            .filter(profiles::Column::Id.eq(id))
            .filter(profiles::Column::CreditsUsed.gte(amount))
            .exec(&self.conn)
            .await
            .context("Failed to refund credits")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_stripe_customer(&self, id: &str, customer_id: &str) -> Result<()> {
        Profiles::update_many()
            .col_expr(
                profiles::Column::StripeCustomerId,
                Expr::value(customer_id.to_string()),
            )
            .filter(profiles::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to store Stripe customer id")?;

        Ok(())
    }

    /// Moves a profile onto a paid plan and starts a fresh billing window.
    pub async fn activate_subscription(
        &self,
        id: &str,
        plan: PlanId,
        subscription_id: Option<&str>,
        next_reset_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = Profiles::update_many()
            .col_expr(profiles::Column::PlanId, Expr::value(plan.as_str()))
            .col_expr(
                profiles::Column::StripeSubscriptionId,
                Expr::value(subscription_id.map(str::to_string)),
            )
            .col_expr(profiles::Column::CreditsUsed, Expr::value(0i64))
            .col_expr(
                profiles::Column::CreditsResetAt,
                Expr::value(format_timestamp(next_reset_at)),
            )
            .filter(profiles::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to activate subscription")?;

        Ok(result.rows_affected > 0)
    }

    /// Downgrades every profile attached to `subscription_id` to the free plan.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<u64> {
        let result = Profiles::update_many()
            .col_expr(profiles::Column::PlanId, Expr::value(PlanId::Free.as_str()))
            .col_expr(
                profiles::Column::StripeSubscriptionId,
                Expr::value(Option::<String>::None),
            )
            .filter(profiles::Column::StripeSubscriptionId.eq(subscription_id))
            .exec(&self.conn)
            .await
            .context("Failed to cancel subscription")?;

        Ok(result.rows_affected)
    }
}
