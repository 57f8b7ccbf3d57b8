use axum::{
    Extension,
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::constants::rate_limit::WINDOW_SECONDS;
use crate::models::account::AccountContext;

/// Start of the fixed one-minute window containing `unix_seconds`.
#[must_use]
pub const fn window_start(unix_seconds: i64) -> i64 {
    unix_seconds.div_euclid(WINDOW_SECONDS) * WINDOW_SECONDS
}

/// Seconds until the window containing `unix_seconds` closes, at least 1.
#[must_use]
pub const fn retry_after(unix_seconds: i64) -> i64 {
    let remaining = window_start(unix_seconds) + WINDOW_SECONDS - unix_seconds;
    if remaining < 1 { 1 } else { remaining }
}

/// Counts the request against the key's current window and rejects it once
/// the plan's per-minute ceiling is exceeded.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let now = Utc::now().timestamp();
    let limit = account.plan.rate_limit();

    let count = state
        .store()
        .hit_rate_limit(&account.api_key_id, window_start(now))
        .await?;

    if count > i64::from(limit) {
        metrics::counter!("rate_limited_total", "plan" => account.plan.as_str()).increment(1);
        return Err(ApiError::RateLimited {
            limit,
            plan: account.plan.to_string(),
            retry_after: retry_after(now),
        });
    }

    let remaining = (i64::from(limit) - count).max(0);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start_is_minute_aligned() {
        assert_eq!(window_start(0), 0);
        assert_eq!(window_start(59), 0);
        assert_eq!(window_start(60), 60);
        assert_eq!(window_start(1_700_000_039), 1_699_999_980);
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(retry_after(0), 60);
        assert_eq!(retry_after(59), 1);
        assert_eq!(retry_after(90), 30);
    }
}
