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
use crate::services::audit::{AuditParams, AuditReport};
use crate::services::recommend::{ContentPlan, RecommendParams};

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub domain: Option<String>,
    pub sitemap_url: Option<String>,
    pub max_pages: Option<u32>,
}

impl AuditRequest {
    fn into_params(self) -> Result<AuditParams, ApiError> {
        let domain = normalize_domain(self.domain.as_deref())?;
        let max_pages = validate_range(
            "max_pages",
            self.max_pages.unwrap_or(limits::DEFAULT_AUDIT_PAGES),
            1,
            limits::MAX_AUDIT_PAGES,
        )?;

        let sitemap_url = self
            .sitemap_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if let Some(url) = &sitemap_url
            && !(url.starts_with("https://") || url.starts_with("http://"))
        {
            return Err(ApiError::validation(format!(
                "Invalid sitemap_url: {url}. Must be an http(s) URL"
            )));
        }

        Ok(AuditParams {
            domain,
            sitemap_url,
            max_pages: usize::try_from(max_pages).unwrap_or(usize::MAX),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub domain: Option<String>,
    pub focus_topics: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub country: Option<String>,
    pub language: Option<String>,
}

impl RecommendRequest {
    fn into_params(self) -> Result<RecommendParams, ApiError> {
        let domain = normalize_domain(self.domain.as_deref())?;
        let limit = validate_range(
            "limit",
            self.limit.unwrap_or(limits::DEFAULT_RECOMMEND_LIMIT),
            1,
            limits::MAX_RECOMMEND_LIMIT,
        )?;

        Ok(RecommendParams {
            domain,
            focus_topics: clean_list(self.focus_topics),
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
            country: locale_code(self.country, "us"),
            language: locale_code(self.language, "en"),
        })
    }
}

/// POST /v1/content/audit
pub async fn audit(
    State(state): State<Arc<AppState>>,
    Extension(reservation): Extension<Reservation>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuditReport>>, ApiError> {
    let params = parse_body(body)?.into_params()?;

    let report = state.shared.auditor.audit(&params).await?;

    let meta = ResponseMeta::for_reservation(&reservation, &request_id);
    Ok(Json(ApiResponse::with_meta(report, meta)))
}

/// POST /v1/content/recommend
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(reservation): Extension<Reservation>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ContentPlan>>, ApiError> {
    let params = parse_body(body)?.into_params()?;

    let plan = state
        .shared
        .recommender
        .recommend(&params)
        .await
        .map_err(|e| ApiError::provider("Failed to generate recommendations.", &e))?;

    let meta = ResponseMeta::for_reservation(&reservation, &request_id);
    Ok(Json(ApiResponse::with_meta(plan, meta)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_request_bounds() {
        let ok: AuditRequest =
            serde_json::from_str(r#"{"domain": "example.com", "max_pages": 500}"#).unwrap();
        assert_eq!(ok.into_params().unwrap().max_pages, 500);

        let defaulted: AuditRequest = serde_json::from_str(r#"{"domain": "example.com"}"#).unwrap();
        assert_eq!(defaulted.into_params().unwrap().max_pages, 100);

        let too_many: AuditRequest =
            serde_json::from_str(r#"{"domain": "example.com", "max_pages": 501}"#).unwrap();
        assert!(too_many.into_params().is_err());

        let bad_sitemap: AuditRequest =
            serde_json::from_str(r#"{"domain": "example.com", "sitemap_url": "example.com/s.xml"}"#)
                .unwrap();
        assert!(bad_sitemap.into_params().is_err());
    }

    #[test]
    fn test_recommend_request_defaults() {
        let request: RecommendRequest =
            serde_json::from_str(r#"{"domain": "example.com", "focus_topics": ["crm", ""]}"#)
                .unwrap();
        let params = request.into_params().unwrap();

        assert_eq!(params.limit, 20);
        assert_eq!(params.focus_topics, vec!["crm".to_string()]);

        let zero: RecommendRequest =
            serde_json::from_str(r#"{"domain": "example.com", "limit": 0}"#).unwrap();
        assert!(zero.into_params().is_err());
    }
}
