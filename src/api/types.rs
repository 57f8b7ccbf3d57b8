use serde::Serialize;

use crate::models::account::Reservation;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Billing details attached to metered responses.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseMeta {
    pub credits_used: i64,
    /// `null` on unlimited plans
    pub credits_remaining: Option<i64>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

impl ResponseMeta {
    #[must_use]
    pub fn for_reservation(reservation: &Reservation, request_id: &RequestId) -> Self {
        Self {
            credits_used: reservation.cost,
            credits_remaining: reservation.credits_remaining(),
            request_id: request_id.0.clone(),
            cached: None,
        }
    }

    #[must_use]
    pub const fn cached(mut self, cached: bool) -> Self {
        self.cached = Some(cached);
        self
    }
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
        }
    }

    pub const fn with_meta(data: T, meta: ResponseMeta) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(meta),
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
            meta: None,
        }
    }
}

/// Per-request identifier, set by the logging middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
