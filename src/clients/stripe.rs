use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::StripeConfig;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}

/// Parameters of a subscription checkout with inline monthly pricing.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub customer_id: &'a str,
    pub user_id: &'a str,
    pub plan: &'a str,
    pub product_name: &'a str,
    pub description: &'a str,
    pub unit_amount_cents: i64,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Hosted billing provider. The live implementation talks to Stripe.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, GatewayError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    #[must_use]
    pub fn new(client: Client, config: &StripeConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, GatewayError> {
        if self.secret_key.is_empty() {
            return Err(GatewayError::NotConfigured);
        }

        debug!(path, "Calling Stripe");

        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|e| {
                    let kind = e.error.kind.unwrap_or_default();
                    e.error.message.map(|m| {
                        if kind.is_empty() {
                            m
                        } else {
                            format!("{m} ({kind})")
                        }
                    })
                })
                .unwrap_or_else(|| format!("Stripe returned HTTP {}", status.as_u16()));

            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, GatewayError> {
        let form = [pair("email", email), pair("metadata[user_id]", user_id)];
        let customer: CustomerResponse = self.post_form("/customers", &form).await?;
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, GatewayError> {
        let form = [
            pair("customer", request.customer_id),
            pair("mode", "subscription"),
            pair("line_items[0][price_data][currency]", "usd"),
            pair(
                "line_items[0][price_data][product_data][name]",
                request.product_name,
            ),
            pair(
                "line_items[0][price_data][product_data][description]",
                request.description,
            ),
            pair(
                "line_items[0][price_data][unit_amount]",
                request.unit_amount_cents.to_string(),
            ),
            pair("line_items[0][price_data][recurring][interval]", "month"),
            pair("line_items[0][quantity]", "1"),
            pair("success_url", request.success_url),
            pair("cancel_url", request.cancel_url),
            pair("metadata[user_id]", request.user_id),
            pair("metadata[plan]", request.plan),
        ];

        let session: SessionResponse = self.post_form("/checkout/sessions", &form).await?;

        let url = session.url.ok_or_else(|| GatewayError::Api {
            status: 200,
            message: "Checkout session has no URL".to_string(),
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}
