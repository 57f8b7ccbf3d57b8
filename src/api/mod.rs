use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::{Providers, SharedState};

pub mod auth;
mod billing;
mod content;
pub mod credits;
mod error;
mod keys;
mod keywords;
mod observability;
pub mod rate_limit;
mod system;
mod types;
mod validation;
mod usage;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Same as [`create_app_state_from_config`] with caller-supplied integrations.
pub async fn create_app_state_with_providers(
    config: Config,
    providers: Providers,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_providers(config, providers).await?);
    Ok(create_app_state(shared, None))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let v1_router = Router::new()
        .merge(create_protected_router(state.clone()))
        .route("/auth/register", post(keys::register))
        .route("/billing/webhook", post(billing::webhook));

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(system::index))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .nest("/v1", v1_router)
        .fallback(system::not_found)
        .with_state(state)
        .layer(
            cors_layer
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

/// Authenticated routes. Layers run bottom-up: auth, then rate limiting, then
/// (for paid endpoints) credit metering.
fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let metered = Router::new()
        .route("/keywords/research", post(keywords::research))
        .route("/keywords/gaps", post(keywords::gaps))
        .route("/content/audit", post(content::audit))
        .route("/content/recommend", post(content::recommend))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            credits::credits_middleware,
        ));

    Router::new()
        .merge(metered)
        .route("/usage", get(usage::get_usage))
        .route("/keys", get(keys::list_keys).post(keys::create_key))
        .route("/keys/{id}", delete(keys::revoke_key))
        .route("/billing/checkout", post(billing::checkout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
