use axum::{Extension, Json, extract::State};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, RequestId, ResponseMeta};
use crate::constants::{billing, limits};
use crate::db::UsageLog;
use crate::models::account::AccountContext;
use crate::models::plan::PlanId;
use crate::models::{format_timestamp, parse_timestamp};

#[derive(Debug, Serialize)]
pub struct UsageCall {
    pub endpoint: String,
    pub credits_used: i64,
    pub status_code: i32,
    pub response_time_ms: i64,
    pub created_at: String,
}

impl From<UsageLog> for UsageCall {
    fn from(row: UsageLog) -> Self {
        Self {
            endpoint: row.endpoint,
            credits_used: row.credits_used,
            status_code: row.status_code,
            response_time_ms: row.response_time_ms,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub plan: PlanId,
    pub credits_used: i64,
    /// `null` on unlimited plans
    pub credits_limit: Option<i64>,
    pub credits_remaining: Option<i64>,
    pub requests_today: u64,
    pub rate_limit: u32,
    pub billing_period_start: Option<String>,
    pub billing_period_end: String,
    pub recent_calls: Vec<UsageCall>,
    pub upgrade_url: String,
}

/// GET /v1/usage
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<UsageReport>>, ApiError> {
    let profile = state
        .store()
        .get_profile(&account.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    let plan = PlanId::from_stored(&profile.plan_id);

    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or_else(Utc::now);

    let requests_today = state
        .store()
        .count_usage_since(&profile.id, &format_timestamp(midnight))
        .await?;

    let recent_calls = state
        .store()
        .recent_usage(&profile.id, limits::RECENT_USAGE_CALLS)
        .await?
        .into_iter()
        .map(UsageCall::from)
        .collect();

    let billing_period_start = parse_timestamp(&profile.credits_reset_at)
        .map(|end| format_timestamp(end - Duration::days(billing::CREDIT_WINDOW_DAYS)));

    let credits_remaining = plan.credits_remaining(profile.credits_used);

    let report = UsageReport {
        plan,
        credits_used: profile.credits_used,
        credits_limit: plan.credit_limit(),
        credits_remaining,
        requests_today,
        rate_limit: plan.rate_limit(),
        billing_period_start,
        billing_period_end: profile.credits_reset_at,
        recent_calls,
        upgrade_url: state.shared.config.general.upgrade_url.clone(),
    };

    let meta = ResponseMeta {
        credits_used: 0,
        credits_remaining,
        request_id: request_id.0,
        cached: None,
    };

    Ok(Json(ApiResponse::with_meta(report, meta)))
}
