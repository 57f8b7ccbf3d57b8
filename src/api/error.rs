use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::clients::ProviderError;
use crate::services::{AccountError, AuditError, BillingError, MeteringError};

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),

    ValidationError(String),

    InvalidPlan(String),

    InsufficientCredits(String),

    NotFound(String),

    AlreadyExists(String),

    RateLimited {
        limit: u32,
        plan: String,
        retry_after: i64,
    },

    ProviderError(String),

    AuditError(String),

    BillingError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::InvalidPlan(msg) => write!(f, "Invalid plan: {msg}"),
            Self::InsufficientCredits(msg) => write!(f, "Insufficient credits: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::AlreadyExists(msg) => write!(f, "Already exists: {msg}"),
            Self::RateLimited { limit, plan, .. } => {
                write!(f, "Rate limited: {limit} requests/minute on {plan} plan")
            }
            Self::ProviderError(msg) => write!(f, "Provider error: {msg}"),
            Self::AuditError(msg) => write!(f, "Audit error: {msg}"),
            Self::BillingError(msg) => write!(f, "Billing error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidPlan(_) => "INVALID_PLAN",
            Self::InsufficientCredits(_) => "INSUFFICIENT_CREDITS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::ProviderError(_) => "PROVIDER_ERROR",
            Self::AuditError(_) => "AUDIT_ERROR",
            Self::BillingError(_) => "BILLING_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::ValidationError(_) | Self::InvalidPlan(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderError(_) | Self::AuditError(_) | Self::BillingError(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn insufficient_credits(needed: i64, remaining: i64, upgrade_url: &str) -> Self {
        Self::InsufficientCredits(format!(
            "This endpoint requires {needed} credits. You have {remaining} remaining. Upgrade at {upgrade_url}"
        ))
    }

    /// Upstream data failure. The cause is logged; only `public` reaches the
    /// caller.
    pub fn provider(public: &str, cause: &impl fmt::Display) -> Self {
        tracing::warn!(error = %cause, "Keyword provider request failed");
        Self::ProviderError(public.to_string())
    }

    fn public_message(&self) -> String {
        match self {
            Self::RateLimited { limit, plan, .. } => {
                format!("Rate limit exceeded. {limit} requests/minute on {plan} plan.")
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An unexpected error occurred".to_string()
            }
            Self::Unauthorized(msg)
            | Self::ValidationError(msg)
            | Self::InvalidPlan(msg)
            | Self::InsufficientCredits(msg)
            | Self::NotFound(msg)
            | Self::AlreadyExists(msg)
            | Self::ProviderError(msg)
            | Self::AuditError(msg)
            | Self::BillingError(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();
        let body = ApiResponse::<()>::error(self.code(), message);

        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited {
            limit, retry_after, ..
        } = &self
        {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(*limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
            headers.insert("retry-after", HeaderValue::from(*retry_after));
        }

        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<MeteringError> for ApiError {
    fn from(err: MeteringError) -> Self {
        match err {
            MeteringError::InsufficientCredits { needed, remaining } => Self::InsufficientCredits(
                format!("This endpoint requires {needed} credits. You have {remaining} remaining."),
            ),
            MeteringError::Storage(e) => Self::from(e),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::MalformedKey | AccountError::InvalidKey | AccountError::UserNotFound => {
                Self::Unauthorized(err.to_string())
            }
            AccountError::AlreadyExists(_) => Self::AlreadyExists(err.to_string()),
            AccountError::KeyNotFound => Self::NotFound(err.to_string()),
            AccountError::Validation(msg) => Self::ValidationError(msg),
            AccountError::Internal(e) => Self::from(e),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self::provider("Keyword data provider is unavailable. Please try again.", &err)
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        tracing::warn!(error = %err, "Content audit failed");
        Self::AuditError("Failed to audit content. Check the domain is accessible.".to_string())
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidPlan => Self::InvalidPlan(err.to_string()),
            BillingError::InvalidPayload(_) | BillingError::InvalidSignature => {
                Self::ValidationError(err.to_string())
            }
            BillingError::Gateway(e) => {
                tracing::warn!(error = %e, "Payment gateway request failed");
                Self::BillingError("Failed to create checkout session.".to_string())
            }
            BillingError::Internal(e) => Self::from(e),
        }
    }
}
