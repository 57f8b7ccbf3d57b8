use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::constants::credits;
use crate::models::plan::PlanId;

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub credits: i64,
}

#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub id: PlanId,
    pub credits: Option<i64>,
    pub rate_limit: u32,
    pub price_cents: Option<i64>,
    pub features: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub docs: String,
    pub status: &'static str,
    pub endpoints: Vec<EndpointInfo>,
    pub plans: Vec<PlanInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

const ENDPOINTS: [(&str, &str); 9] = [
    ("POST", "/v1/keywords/research"),
    ("POST", "/v1/keywords/gaps"),
    ("POST", "/v1/content/audit"),
    ("POST", "/v1/content/recommend"),
    ("GET", "/v1/usage"),
    ("POST", "/v1/auth/register"),
    ("GET", "/v1/keys"),
    ("POST", "/v1/keys"),
    ("POST", "/v1/billing/checkout"),
];

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    let endpoints = ENDPOINTS
        .iter()
        .map(|&(method, path)| EndpointInfo {
            method,
            path,
            credits: if path.starts_with("/v1/keywords/") || path.starts_with("/v1/content/") {
                credits::endpoint_cost(path)
            } else {
                0
            },
        })
        .collect();

    let plans = PlanId::ALL
        .iter()
        .map(|&plan| PlanInfo {
            id: plan,
            credits: plan.credit_limit(),
            rate_limit: plan.rate_limit(),
            price_cents: plan.price_cents(),
            features: plan.features(),
        })
        .collect();

    Json(ServiceInfo {
        name: "AgenticPencil API",
        version: env!("CARGO_PKG_VERSION"),
        docs: state.shared.config.general.docs_url.clone(),
        status: "operational",
        endpoints,
        plans,
    })
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthStatus>, ApiError> {
    state.store().ping().await?;

    Ok(Json(HealthStatus {
        status: "ok",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

pub async fn not_found(State(state): State<Arc<AppState>>) -> ApiError {
    ApiError::not_found(format!(
        "Endpoint not found. See docs: {}",
        state.shared.config.general.docs_url
    ))
}
