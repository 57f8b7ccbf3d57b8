//! Competitor keyword gaps: terms competitors rank for that the target does not.

use std::sync::Arc;

use serde::Serialize;

use crate::clients::{KeywordProvider, ProviderError};
use crate::constants::limits;
use crate::models::keyword::{KeywordData, Locale, SearchIntent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapParams {
    pub domain: String,
    pub competitors: Vec<String>,
    pub country: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordGap {
    pub keyword: String,
    pub search_volume: i64,
    pub keyword_difficulty: i64,
    pub cpc: f64,
    pub competition_level: String,
    pub search_intent: SearchIntent,
    pub opportunity: i64,
}

impl From<KeywordData> for KeywordGap {
    fn from(k: KeywordData) -> Self {
        Self {
            opportunity: gap_opportunity(k.search_volume, k.keyword_difficulty),
            keyword: k.keyword,
            search_volume: k.search_volume,
            keyword_difficulty: k.keyword_difficulty,
            cpc: k.cpc,
            competition_level: k.competition_level,
            search_intent: k.search_intent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReport {
    pub domain: String,
    pub competitors_analyzed: Vec<String>,
    pub gaps: Vec<KeywordGap>,
    pub total_gaps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `round(volume / 100 * (100 - difficulty))`, zero for keywords without volume.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn gap_opportunity(search_volume: i64, keyword_difficulty: i64) -> i64 {
    if search_volume <= 0 {
        return 0;
    }
    ((search_volume as f64 / 100.0) * (100 - keyword_difficulty) as f64).round() as i64
}

pub struct GapAnalyzer {
    provider: Arc<dyn KeywordProvider>,
}

impl GapAnalyzer {
    #[must_use]
    pub fn new(provider: Arc<dyn KeywordProvider>) -> Self {
        Self { provider }
    }

    /// Uses the supplied competitors, or discovers them when none are given.
    /// At most three competitors are compared.
    pub async fn find_gaps(&self, params: &GapParams) -> Result<GapReport, ProviderError> {
        let locale = Locale::resolve(&params.country, &params.language);

        let mut competitors = if params.competitors.is_empty() {
            self.provider
                .competitor_domains(&params.domain, &locale, 10)
                .await?
        } else {
            params.competitors.clone()
        };
        competitors.truncate(limits::MAX_COMPETITORS);

        if competitors.is_empty() {
            return Ok(GapReport {
                domain: params.domain.clone(),
                competitors_analyzed: vec![],
                gaps: vec![],
                total_gaps: 0,
                message: Some("No competitors found for this domain.".to_string()),
            });
        }

        let gaps: Vec<KeywordGap> = self
            .provider
            .keyword_gaps(&params.domain, &competitors, &locale, limits::GAP_RESULTS)
            .await?
            .into_iter()
            .filter(|k| !k.keyword.is_empty())
            .map(KeywordGap::from)
            .collect();

        Ok(GapReport {
            domain: params.domain.clone(),
            total_gaps: gaps.len(),
            competitors_analyzed: competitors,
            gaps,
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_opportunity() {
        assert_eq!(gap_opportunity(1000, 30), 700);
        assert_eq!(gap_opportunity(150, 45), 83);
        assert_eq!(gap_opportunity(0, 10), 0);
        assert_eq!(gap_opportunity(-5, 10), 0);
    }
}
