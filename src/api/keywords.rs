use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{clean_list, locale_code, normalize_domain, parse_body, validate_range};
use super::{ApiError, ApiResponse, AppState, RequestId, ResponseMeta};
use crate::constants::limits;
use crate::models::account::Reservation;
use crate::services::gaps::{GapParams, GapReport};
use crate::services::keywords::{ResearchParams, ResearchReport};

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub domain: Option<String>,
    pub topic: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub limit: Option<u32>,
}

impl ResearchRequest {
    fn into_params(self) -> Result<ResearchParams, ApiError> {
        let domain = normalize_domain(self.domain.as_deref())?;
        let limit = validate_range(
            "limit",
            self.limit.unwrap_or(limits::DEFAULT_RESEARCH_LIMIT),
            1,
            limits::MAX_RESEARCH_LIMIT,
        )?;

        Ok(ResearchParams {
            domain,
            topic: self
                .topic
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            keywords: clean_list(self.keywords),
            country: locale_code(self.country, "us"),
            language: locale_code(self.language, "en"),
            limit,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct GapsRequest {
    pub domain: Option<String>,
    pub competitors: Option<Vec<String>>,
    pub country: Option<String>,
    pub language: Option<String>,
}

impl GapsRequest {
    fn into_params(self) -> Result<GapParams, ApiError> {
        let domain = normalize_domain(self.domain.as_deref())?;
        let competitors = clean_list(self.competitors)
            .iter()
            .map(|c| normalize_domain(Some(c)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GapParams {
            domain,
            competitors,
            country: locale_code(self.country, "us"),
            language: locale_code(self.language, "en"),
        })
    }
}

/// POST /v1/keywords/research
pub async fn research(
    State(state): State<Arc<AppState>>,
    Extension(reservation): Extension<Reservation>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ResearchReport>>, ApiError> {
    let params = parse_body(body)?.into_params()?;

    let outcome = state
        .shared
        .research
        .research(&params)
        .await
        .map_err(|e| ApiError::provider("Failed to fetch keyword data. Please try again.", &e))?;

    let meta = ResponseMeta::for_reservation(&reservation, &request_id).cached(outcome.cached);
    Ok(Json(ApiResponse::with_meta(outcome.report, meta)))
}

/// POST /v1/keywords/gaps
pub async fn gaps(
    State(state): State<Arc<AppState>>,
    Extension(reservation): Extension<Reservation>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<GapsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<GapReport>>, ApiError> {
    let params = parse_body(body)?.into_params()?;

    let report = state
        .shared
        .gaps
        .find_gaps(&params)
        .await
        .map_err(|e| ApiError::provider("Failed to fetch competitor data.", &e))?;

    let meta = ResponseMeta::for_reservation(&reservation, &request_id);
    Ok(Json(ApiResponse::with_meta(report, meta)))
}
