use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::parse_body;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::models::account::AccountContext;
use crate::services::accounts::{IssuedKey, KeySummary, Registration};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateKeyRequest {
    pub name: Option<String>,
}

/// POST /v1/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>), ApiError> {
    let request = parse_body(body)?;

    let registration = state
        .shared
        .accounts
        .register(&request.email, request.name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

/// GET /v1/keys
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
) -> Result<Json<ApiResponse<Vec<KeySummary>>>, ApiError> {
    let keys = state.shared.accounts.list_keys(&account.user_id).await?;
    Ok(Json(ApiResponse::success(keys)))
}

/// POST /v1/keys
///
/// The body is optional; an empty request creates a key named "Default".
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
    body: Option<Json<CreateKeyRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<IssuedKey>>), ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let key = state
        .shared
        .accounts
        .create_key(&account.user_id, request.name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(key))))
}

/// DELETE /v1/keys/{id}
pub async fn revoke_key(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AccountContext>,
    Path(key_id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .shared
        .accounts
        .revoke_key(&account.user_id, &key_id)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("API key {key_id} revoked"),
    })))
}
