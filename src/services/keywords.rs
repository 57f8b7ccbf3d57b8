//! Keyword research: merges ranked and suggested keywords, groups them into
//! topical clusters and scores each cluster.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::clients::{KeywordProvider, ProviderError};
use crate::db::Store;
use crate::models::keyword::{KeywordData, Locale};

const CACHE_ENDPOINT: &str = "/v1/keywords/research";

/// Validated research parameters. Field order defines the canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchParams {
    pub domain: String,
    pub topic: Option<String>,
    pub keywords: Vec<String>,
    pub country: String,
    pub language: String,
    pub limit: u32,
}

impl ResearchParams {
    /// SHA-256 of the canonical JSON form of the parameters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    fn seeds(&self) -> Option<Vec<String>> {
        if !self.keywords.is_empty() {
            Some(self.keywords.clone())
        } else {
            self.topic.as_ref().map(|t| vec![t.clone()])
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCluster {
    pub cluster_name: String,
    pub primary_keyword: KeywordData,
    pub related_keywords: Vec<KeywordData>,
    pub total_volume: i64,
    pub avg_difficulty: i64,
    pub opportunity_score: i64,
    pub keyword_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub domain: String,
    pub topic: String,
    pub country: String,
    pub clusters: Vec<KeywordCluster>,
    pub total_keywords: usize,
}

#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub report: ResearchReport,
    pub cached: bool,
}

/// Lower-cased whitespace tokens longer than two characters.
#[must_use]
pub fn significant_words(keyword: &str) -> Vec<String> {
    keyword
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Drops empty keywords and keeps the first occurrence of each exact keyword.
#[must_use]
pub fn dedupe_keywords(keywords: Vec<KeywordData>) -> Vec<KeywordData> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .filter(|k| !k.keyword.is_empty() && seen.insert(k.keyword.clone()))
        .collect()
}

/// High volume and low difficulty score highest. Clamped to 0..=100.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn cluster_opportunity_score(total_volume: i64, avg_difficulty: f64) -> i64 {
    let raw = (total_volume as f64 / 1000.0) * (100.0 - avg_difficulty) / 100.0 * 10.0;
    (raw.round() as i64).clamp(0, 100)
}

/// Greedy single-pass clustering.
///
/// Keywords are visited by descending volume. Each unassigned keyword seeds a
/// cluster and pulls in every other unassigned keyword sharing at least
/// `min(2, seed word count)` significant words with it, so a seed without
/// significant words absorbs every keyword still unassigned. Clusters come
/// back sorted by opportunity score, ties keeping their discovery order.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn cluster_keywords(keywords: &[KeywordData]) -> Vec<KeywordCluster> {
    let mut sorted: Vec<&KeywordData> = keywords.iter().collect();
    sorted.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));

    let words: Vec<Vec<String>> = sorted.iter().map(|k| significant_words(&k.keyword)).collect();
    let mut assigned = vec![false; sorted.len()];
    let mut clusters = Vec::new();

    for seed in 0..sorted.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;

        let seed_words = &words[seed];
        let needed = seed_words.len().min(2);
        let mut members = vec![sorted[seed]];

        for other in 0..sorted.len() {
            if assigned[other] {
                continue;
            }
            let overlap = seed_words
                .iter()
                .filter(|w| words[other].contains(*w))
                .count();
            if overlap >= needed {
                assigned[other] = true;
                members.push(sorted[other]);
            }
        }

        let total_volume: i64 = members.iter().map(|k| k.search_volume).sum();
        let avg_difficulty = members.iter().map(|k| k.keyword_difficulty).sum::<i64>() as f64
            / members.len() as f64;

        clusters.push(KeywordCluster {
            cluster_name: sorted[seed].keyword.clone(),
            primary_keyword: members[0].clone(),
            related_keywords: members[1..].iter().map(|k| (*k).clone()).collect(),
            total_volume,
            avg_difficulty: avg_difficulty.round() as i64,
            opportunity_score: cluster_opportunity_score(total_volume, avg_difficulty),
            keyword_count: members.len(),
        });
    }

    clusters.sort_by(|a, b| b.opportunity_score.cmp(&a.opportunity_score));
    clusters
}

pub struct KeywordResearchService {
    store: Store,
    provider: Arc<dyn KeywordProvider>,
    cache_ttl: Duration,
}

impl KeywordResearchService {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn KeywordProvider>, cache_ttl_hours: i64) -> Self {
        Self {
            store,
            provider,
            cache_ttl: Duration::hours(cache_ttl_hours),
        }
    }

    /// Serves from the result cache when possible. Cache failures degrade to a
    /// live lookup; provider failures are returned unchanged.
    pub async fn research(&self, params: &ResearchParams) -> Result<ResearchOutcome, ProviderError> {
        let cache_key = params.cache_key();

        match self.store.get_cached::<ResearchReport>(&cache_key).await {
            Ok(Some(report)) => {
                debug!(domain = %params.domain, "Keyword research served from cache");
                return Ok(ResearchOutcome {
                    report,
                    cached: true,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Keyword research cache lookup failed"),
        }

        let locale = Locale::resolve(&params.country, &params.language);

        let mut all = self
            .provider
            .ranked_keywords(&params.domain, &locale, params.limit)
            .await?;

        if let Some(seeds) = params.seeds() {
            let suggestions = self
                .provider
                .keyword_suggestions(&seeds, &locale, params.limit)
                .await?;
            all.extend(suggestions);
        }

        let keywords = dedupe_keywords(all);
        let clusters = cluster_keywords(&keywords);

        let report = ResearchReport {
            domain: params.domain.clone(),
            topic: params
                .topic
                .clone()
                .unwrap_or_else(|| params.domain.clone()),
            country: params.country.clone(),
            clusters,
            total_keywords: keywords.len(),
        };

        if let Err(e) = self
            .store
            .put_cached(&cache_key, CACHE_ENDPOINT, &report, self.cache_ttl)
            .await
        {
            warn!(error = %e, "Failed to cache keyword research result");
        }

        Ok(ResearchOutcome {
            report,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keyword::SearchIntent;

    fn kw(keyword: &str, volume: i64, difficulty: i64) -> KeywordData {
        KeywordData {
            keyword: keyword.to_string(),
            search_volume: volume,
            keyword_difficulty: difficulty,
            cpc: 0.0,
            competition: 0.0,
            competition_level: "LOW".to_string(),
            search_intent: SearchIntent::Informational,
            monthly_searches: vec![],
        }
    }

    fn params() -> ResearchParams {
        ResearchParams {
            domain: "example.com".to_string(),
            topic: None,
            keywords: vec![],
            country: "us".to_string(),
            language: "en".to_string(),
            limit: 50,
        }
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(
            significant_words("Best SEO  tools for AI"),
            vec!["best", "seo", "tools"]
        );
        assert!(significant_words("ai ml").is_empty());
    }

    #[test]
    fn test_clusters_group_on_two_shared_words() {
        let keywords = vec![
            kw("best seo tools", 5000, 40),
            kw("free seo tools online", 1000, 30),
            kw("seo audit", 800, 20),
            kw("content marketing", 600, 50),
        ];

        let clusters = cluster_keywords(&keywords);
        let seo = clusters
            .iter()
            .find(|c| c.cluster_name == "best seo tools")
            .unwrap();

        assert_eq!(seo.keyword_count, 2);
        assert_eq!(seo.related_keywords[0].keyword, "free seo tools online");
        assert_eq!(seo.total_volume, 6000);
        assert_eq!(seo.avg_difficulty, 35);
        assert_eq!(clusters.len(), 3);
    }

    #[test]
    fn test_single_word_seed_needs_one_shared_word() {
        let keywords = vec![kw("wordpress", 9000, 80), kw("wordpress themes", 400, 30)];

        let clusters = cluster_keywords(&keywords);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].keyword_count, 2);
    }

    #[test]
    fn test_seed_without_significant_words_absorbs_the_rest() {
        let keywords = vec![
            kw("ai", 9000, 10),
            kw("ai tools", 500, 10),
            kw("seo audit", 100, 10),
        ];

        let clusters = cluster_keywords(&keywords);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].keyword_count, 3);
        assert_eq!(clusters[0].primary_keyword.keyword, "ai");
    }

    #[test]
    fn test_zero_word_seed_only_takes_unassigned_keywords() {
        let keywords = vec![
            kw("seo audit tool", 5000, 40),
            kw("seo audit checklist", 800, 30),
            kw("ai", 600, 10),
            kw("content brief", 100, 20),
        ];

        let clusters = cluster_keywords(&keywords);
        assert_eq!(clusters.len(), 2);
        let counts: Vec<usize> = clusters.iter().map(|c| c.keyword_count).collect();
        assert!(counts.contains(&2));
        let ai = clusters.iter().find(|c| c.cluster_name == "ai").unwrap();
        assert_eq!(ai.keyword_count, 2);
        assert_eq!(ai.related_keywords[0].keyword, "content brief");
    }

    #[test]
    fn test_every_keyword_lands_in_exactly_one_cluster() {
        let keywords = vec![
            kw("rust web framework", 3000, 50),
            kw("rust web server", 2000, 45),
            kw("web framework comparison", 1500, 40),
            kw("python web framework", 1400, 60),
            kw("async rust", 900, 30),
        ];

        let clusters = cluster_keywords(&keywords);
        let total: usize = clusters.iter().map(|c| c.keyword_count).sum();
        assert_eq!(total, keywords.len());
    }

    #[test]
    fn test_cluster_opportunity_score() {
        // 20_000 / 1000 * (100 - 20) / 100 * 10 = 160, capped
        assert_eq!(cluster_opportunity_score(20_000, 20.0), 100);
        // 3000 / 1000 * 50 / 100 * 10 = 15
        assert_eq!(cluster_opportunity_score(3000, 50.0), 15);
        assert_eq!(cluster_opportunity_score(0, 10.0), 0);
        assert_eq!(cluster_opportunity_score(5000, 120.0), 0);
    }

    #[test]
    fn test_clusters_sorted_by_score_desc() {
        let keywords = vec![
            kw("hard keyword phrase", 10_000, 95),
            kw("easy keyword match", 8000, 5),
        ];

        let clusters = cluster_keywords(&keywords);
        assert_eq!(clusters[0].cluster_name, "easy keyword match");
    }

    #[test]
    fn test_dedupe_keeps_first_and_drops_empty() {
        let keywords = vec![kw("seo", 10, 1), kw("", 5, 1), kw("seo", 99, 99)];
        let deduped = dedupe_keywords(keywords);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].search_volume, 10);
    }

    #[test]
    fn test_cache_key_depends_on_every_parameter() {
        let base = params();
        let mut other = params();
        other.limit = 51;

        assert_eq!(base.cache_key(), params().cache_key());
        assert_ne!(base.cache_key(), other.cache_key());
        assert_eq!(base.cache_key().len(), 64);
    }

    #[test]
    fn test_seeds_prefer_explicit_keywords() {
        let mut p = params();
        assert!(p.seeds().is_none());

        p.topic = Some("link building".to_string());
        assert_eq!(p.seeds(), Some(vec!["link building".to_string()]));

        p.keywords = vec!["backlinks".to_string()];
        assert_eq!(p.seeds(), Some(vec!["backlinks".to_string()]));
    }
}
