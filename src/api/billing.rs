use axum::{
    Extension, Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::parse_body;
use super::{ApiError, ApiResponse, AppState};
use crate::models::account::AccountContext;
use crate::models::plan::PlanId;
use crate::services::billing::CheckoutResult;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// POST /v1/billing/checkout
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CheckoutResult>>, ApiError> {
    let request = parse_body(body)?;

    let plan = request
        .plan
        .trim()
        .to_lowercase()
        .parse::<PlanId>()
        .ok()
        .filter(|p| p.is_purchasable())
        .ok_or_else(|| ApiError::InvalidPlan("Plan must be \"pro\" or \"scale\"".to_string()))?;

    let result = state.shared.billing.checkout(&account, plan).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /v1/billing/webhook
///
/// Reads the raw body so the signature can be checked against the exact bytes.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    let outcome = state.shared.billing.handle_webhook(&body, signature).await?;
    tracing::debug!(?outcome, "Webhook processed");

    Ok(Json(WebhookAck { received: true }))
}
