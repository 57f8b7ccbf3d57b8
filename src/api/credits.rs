use axum::{
    Extension,
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use super::{ApiError, AppState};
use crate::constants::credits::endpoint_cost;
use crate::models::account::AccountContext;
use crate::services::MeteringError;

/// Reserves the endpoint's cost before the handler runs. The reservation is
/// kept and logged on a 2xx response and refunded otherwise.
pub async fn credits_middleware(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
    OriginalUri(uri): OriginalUri,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let endpoint = uri.path().trim_end_matches('/').to_string();
    let cost = endpoint_cost(&endpoint);

    let reservation = state
        .shared
        .ledger
        .reserve(&account, &endpoint, cost)
        .await
        .map_err(|e| match e {
            MeteringError::InsufficientCredits { needed, remaining } => {
                ApiError::insufficient_credits(
                    needed,
                    remaining,
                    &state.shared.config.general.upgrade_url,
                )
            }
            other => other.into(),
        })?;

    request.extensions_mut().insert(reservation.clone());

    let start = Instant::now();
    let response = next.run(request).await;
    let status = response.status();

    if status.is_success() {
        state
            .shared
            .ledger
            .settle(&reservation, status.as_u16(), start.elapsed())
            .await;
    } else {
        tracing::debug!(endpoint = %endpoint, status = status.as_u16(), "Refunding credits");
        state.shared.ledger.refund(&reservation).await;
    }

    Ok(response)
}
