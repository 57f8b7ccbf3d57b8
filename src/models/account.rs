use super::plan::PlanId;

/// Identity attached to a request once its API key has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub user_id: String,
    pub api_key_id: String,
    pub plan: PlanId,
    pub credits_used: i64,
    pub credits_reset_at: String,
}

impl AccountContext {
    #[must_use]
    pub const fn credit_limit(&self) -> Option<i64> {
        self.plan.credit_limit()
    }

    /// `None` for unlimited plans.
    #[must_use]
    pub fn credits_remaining(&self) -> Option<i64> {
        self.plan.credits_remaining(self.credits_used)
    }
}

/// Credits held against an account for the duration of one metered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub user_id: String,
    pub api_key_id: String,
    pub endpoint: String,
    pub cost: i64,
    pub plan: PlanId,
    /// Account balance after the reservation was applied
    pub credits_used_after: i64,
}

impl Reservation {
    #[must_use]
    pub fn credits_remaining(&self) -> Option<i64> {
        self.plan.credits_remaining(self.credits_used_after)
    }
}
