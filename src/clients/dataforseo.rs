use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::config::DataForSeoConfig;
use crate::models::keyword::{KeywordData, Locale, SearchIntent};

/// DataForSEO reports success with this status code on both the envelope and
/// each task.
const STATUS_OK: i64 = 20000;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("keyword provider credentials are not configured")]
    NotConfigured,

    #[error("keyword provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("keyword provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("keyword provider error {code}: {message}")]
    Api { code: i64, message: String },
}

/// Source of keyword metrics. Implemented by the live DataForSEO client and
/// by in-memory fakes in tests.
#[async_trait]
pub trait KeywordProvider: Send + Sync {
    /// Keywords `domain` currently ranks for, highest volume first.
    async fn ranked_keywords(
        &self,
        domain: &str,
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError>;

    /// Keyword ideas derived from the seed phrases, seeds included.
    async fn keyword_suggestions(
        &self,
        seeds: &[String],
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError>;

    /// Domains competing with `domain` in organic search.
    async fn competitor_domains(
        &self,
        domain: &str,
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<String>, ProviderError>;

    /// Keywords the competitors rank for and `domain` does not.
    async fn keyword_gaps(
        &self,
        domain: &str,
        competitors: &[String],
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError>;
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiEnvelope<T> {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    tasks: Vec<ApiTask<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiTask<T> {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    result: Option<Vec<ApiResult<T>>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiResult<T> {
    #[serde(default)]
    items: Option<Vec<T>>,
}

#[derive(Debug, Default, Deserialize)]
struct RankedItem {
    #[serde(default)]
    keyword_data: Option<KeywordItem>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordItem {
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    keyword_info: Option<KeywordInfo>,
    #[serde(default)]
    keyword_properties: Option<KeywordProperties>,
    #[serde(default)]
    search_intent_info: Option<SearchIntentInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordInfo {
    search_volume: Option<i64>,
    cpc: Option<f64>,
    competition: Option<f64>,
    competition_level: Option<String>,
    #[serde(default)]
    monthly_searches: Option<Vec<MonthlySearch>>,
}

#[derive(Debug, Deserialize)]
struct MonthlySearch {
    search_volume: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordProperties {
    keyword_difficulty: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchIntentInfo {
    main_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompetitorItem {
    domain: Option<String>,
}

impl From<KeywordItem> for KeywordData {
    fn from(item: KeywordItem) -> Self {
        let info = item.keyword_info.unwrap_or_default();

        Self {
            keyword: item.keyword.unwrap_or_default(),
            search_volume: info.search_volume.unwrap_or(0),
            keyword_difficulty: item
                .keyword_properties
                .and_then(|p| p.keyword_difficulty)
                .unwrap_or(0),
            cpc: info.cpc.unwrap_or(0.0),
            competition: info.competition.unwrap_or(0.0),
            competition_level: info
                .competition_level
                .unwrap_or_else(|| "LOW".to_string()),
            search_intent: SearchIntent::from_provider(
                item.search_intent_info
                    .as_ref()
                    .and_then(|i| i.main_intent.as_deref()),
            ),
            monthly_searches: info
                .monthly_searches
                .unwrap_or_default()
                .into_iter()
                .map(|m| m.search_volume.unwrap_or(0))
                .collect(),
        }
    }
}

impl From<RankedItem> for KeywordData {
    fn from(item: RankedItem) -> Self {
        item.keyword_data.unwrap_or_default().into()
    }
}

#[derive(Clone)]
pub struct DataForSeoClient {
    client: Client,
    base_url: String,
    login: String,
    password: String,
}

impl DataForSeoClient {
    #[must_use]
    pub fn new(client: Client, config: &DataForSeoConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login: config.login.clone(),
            password: config.password.clone(),
        }
    }

    /// Posts a single task and returns the items of its first result.
    async fn post_task<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        task: Value,
    ) -> Result<Vec<T>, ProviderError> {
        if self.login.is_empty() || self.password.is_empty() {
            return Err(ProviderError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(endpoint, "Calling DataForSEO");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.login, Some(&self.password))
            .json(&[task])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }

        let envelope: ApiEnvelope<T> = response.json().await?;

        if envelope.status_code != STATUS_OK {
            return Err(ProviderError::Api {
                code: envelope.status_code,
                message: envelope.status_message,
            });
        }

        let Some(task) = envelope.tasks.into_iter().next() else {
            return Ok(Vec::new());
        };

        if task.status_code != STATUS_OK {
            return Err(ProviderError::Api {
                code: task.status_code,
                message: task.status_message,
            });
        }

        Ok(task
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.items)
            .unwrap_or_default())
    }
}

fn numbered_targets<'a>(values: impl Iterator<Item = (usize, &'a str)>) -> Map<String, Value> {
    values
        .map(|(i, v)| (i.to_string(), Value::String(v.to_string())))
        .collect()
}

#[async_trait]
impl KeywordProvider for DataForSeoClient {
    async fn ranked_keywords(
        &self,
        domain: &str,
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError> {
        let items: Vec<RankedItem> = self
            .post_task(
                "/dataforseo_labs/google/ranked_keywords/live",
                json!({
                    "target": domain,
                    "location_name": locale.location_name,
                    "language_name": locale.language_name,
                    "limit": limit,
                    "order_by": ["keyword_data.keyword_info.search_volume,desc"],
                }),
            )
            .await?;

        Ok(items.into_iter().map(KeywordData::from).collect())
    }

    async fn keyword_suggestions(
        &self,
        seeds: &[String],
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError> {
        let items: Vec<KeywordItem> = self
            .post_task(
                "/dataforseo_labs/google/keyword_suggestions/live",
                json!({
                    "keywords": seeds,
                    "location_name": locale.location_name,
                    "language_name": locale.language_name,
                    "limit": limit,
                    "include_seed_keyword": true,
                    "order_by": ["keyword_info.search_volume,desc"],
                }),
            )
            .await?;

        Ok(items.into_iter().map(KeywordData::from).collect())
    }

    async fn competitor_domains(
        &self,
        domain: &str,
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let items: Vec<CompetitorItem> = self
            .post_task(
                "/dataforseo_labs/google/competitors_domain/live",
                json!({
                    "target": domain,
                    "location_name": locale.location_name,
                    "language_name": locale.language_name,
                    "limit": limit,
                }),
            )
            .await?;

        Ok(items
            .into_iter()
            .filter_map(|c| c.domain)
            .filter(|d| !d.is_empty() && d != domain)
            .collect())
    }

    async fn keyword_gaps(
        &self,
        domain: &str,
        competitors: &[String],
        locale: &Locale,
        limit: u32,
    ) -> Result<Vec<KeywordData>, ProviderError> {
        let targets = numbered_targets(
            std::iter::once((1, domain))
                .chain(competitors.iter().enumerate().map(|(i, c)| (i + 2, c.as_str()))),
        );
        let intersections: Map<String, Value> = (0..competitors.len())
            .map(|i| ((i + 2).to_string(), Value::Bool(true)))
            .collect();

        let items: Vec<RankedItem> = self
            .post_task(
                "/dataforseo_labs/google/domain_intersection/live",
                json!({
                    "targets": targets,
                    "location_name": locale.location_name,
                    "language_name": locale.language_name,
                    "limit": limit,
                    "order_by": ["keyword_data.keyword_info.search_volume,desc"],
                    "intersections": intersections,
                    "exclude_intersections": { "1": true },
                }),
            )
            .await?;

        Ok(items.into_iter().map(KeywordData::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_item_mapping_with_missing_fields() {
        let raw = r#"{
            "keyword_data": {
                "keyword": "seo tools",
                "keyword_info": {
                    "search_volume": 1200,
                    "cpc": null,
                    "competition_level": "HIGH",
                    "monthly_searches": [{"search_volume": 1100}, {"search_volume": null}]
                },
                "search_intent_info": {"main_intent": "commercial"}
            }
        }"#;

        let item: RankedItem = serde_json::from_str(raw).unwrap();
        let data = KeywordData::from(item);

        assert_eq!(data.keyword, "seo tools");
        assert_eq!(data.search_volume, 1200);
        assert_eq!(data.keyword_difficulty, 0);
        assert!(data.cpc.abs() < f64::EPSILON);
        assert_eq!(data.competition_level, "HIGH");
        assert_eq!(data.search_intent, SearchIntent::Commercial);
        assert_eq!(data.monthly_searches, vec![1100, 0]);
    }

    #[test]
    fn test_envelope_with_null_items() {
        let raw = r#"{
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{"status_code": 20000, "status_message": "Ok.", "result": [{"items": null}]}]
        }"#;

        let envelope: ApiEnvelope<KeywordItem> = serde_json::from_str(raw).unwrap();
        let items = envelope.tasks[0].result.as_ref().unwrap()[0].items.as_ref();
        assert!(items.is_none());
    }

    #[test]
    fn test_numbered_targets() {
        let targets = numbered_targets([(1, "a.com"), (2, "b.com")].into_iter());
        assert_eq!(targets.get("1"), Some(&Value::String("a.com".to_string())));
        assert_eq!(targets.get("2"), Some(&Value::String("b.com".to_string())));
    }
}
