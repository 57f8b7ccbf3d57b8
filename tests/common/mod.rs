#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use agenticpencil::api::{self, AppState};
use agenticpencil::clients::stripe::{CheckoutRequest, CheckoutSession, GatewayError};
use agenticpencil::clients::{
    FetchedPage, KeywordProvider, PageFetcher, PaymentGateway, ProviderError,
};
use agenticpencil::config::Config;
use agenticpencil::models::keyword::{KeywordData, Locale, SearchIntent};
use agenticpencil::state::Providers;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub fn keyword(text: &str, volume: i64, difficulty: i64, intent: SearchIntent) -> KeywordData {
    KeywordData {
        keyword: text.to_string(),
        search_volume: volume,
        keyword_difficulty: difficulty,
        cpc: 2.5,
        competition: 0.4,
        competition_level: "MEDIUM".to_string(),
        search_intent: intent,
        monthly_searches: vec![volume],
    }
}

#[derive(Default)]
pub struct FakeKeywordProvider {
    pub ranked: Mutex<Vec<KeywordData>>,
    pub suggestions: Mutex<Vec<KeywordData>>,
    pub competitors: Mutex<Vec<String>>,
    pub gaps: Mutex<Vec<KeywordData>>,
    pub suggestion_limits: Mutex<Vec<u32>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeKeywordProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record_call(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Status { status: 500 });
        }
        Ok(())
    }
}

#[async_trait]
impl KeywordProvider for FakeKeywordProvider {
    async fn ranked_keywords(
        &self,
        _domain: &str,
        _locale: &Locale,
        _limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError> {
        self.record_call()?;
        Ok(self.ranked.lock().unwrap().clone())
    }

    async fn keyword_suggestions(
        &self,
        _seeds: &[String],
        _locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError> {
        self.record_call()?;
        self.suggestion_limits.lock().unwrap().push(limit);
        Ok(self.suggestions.lock().unwrap().clone())
    }

    async fn competitor_domains(
        &self,
        _domain: &str,
        _locale: &Locale,
        _limit: u32,
    ) -> Result<Vec<String>, ProviderError> {
        self.record_call()?;
        Ok(self.competitors.lock().unwrap().clone())
    }

    async fn keyword_gaps(
        &self,
        _domain: &str,
        _competitors: &[String],
        _locale: &Locale,
        _limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError> {
        self.record_call()?;
        Ok(self.gaps.lock().unwrap().clone())
    }
}

/// Serves canned pages by URL; unknown URLs fail like a dead host.
#[derive(Default)]
pub struct FakePageFetcher {
    pub pages: Mutex<HashMap<String, FetchedPage>>,
}

impl FakePageFetcher {
    pub fn insert(&self, url: &str, body: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            FetchedPage {
                status: 200,
                body: body.to_string(),
            },
        );
    }
}

#[async_trait]
impl PageFetcher for FakePageFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchedPage> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("connection refused: {url}"))
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub customers_created: AtomicUsize,
    pub last_plan: Mutex<Option<String>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(&self, _email: &str, _user_id: &str) -> Result<String, GatewayError> {
        let n = self.customers_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("cus_test_{n}"))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, GatewayError> {
        *self.last_plan.lock().unwrap() = Some(request.plan.to_string());
        Ok(CheckoutSession {
            id: "cs_test_1".to_string(),
            url: "https://checkout.example.test/cs_test_1".to_string(),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub keywords: Arc<FakeKeywordProvider>,
    pub pages: Arc<FakePageFetcher>,
    pub payments: Arc<FakeGateway>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    config.scheduler.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let keywords = Arc::new(FakeKeywordProvider::default());
    let pages = Arc::new(FakePageFetcher::default());
    let payments = Arc::new(FakeGateway::default());

    let providers = Providers {
        keywords: keywords.clone(),
        pages: pages.clone(),
        payments: payments.clone(),
    };

    let state = api::create_app_state_with_providers(config, providers)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: api::router(state.clone()),
        state,
        keywords,
        pages,
        payments,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers `email` and returns the plaintext key.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .send(post_json(
                "/v1/auth/register",
                None,
                &serde_json::json!({ "email": email }),
            ))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["api_key"].as_str().unwrap().to_string()
    }

    pub async fn user_id(&self, email: &str) -> String {
        self.state
            .store()
            .get_profile_by_email(email)
            .await
            .unwrap()
            .expect("profile exists")
            .id
    }

    pub async fn credits_used(&self, email: &str) -> i64 {
        self.state
            .store()
            .get_profile_by_email(email)
            .await
            .unwrap()
            .expect("profile exists")
            .credits_used
    }
}

pub fn post_json(uri: &str, api_key: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, api_key: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("Authorization", format!("Bearer {api_key}"))
        .body(Body::empty())
        .unwrap()
}
