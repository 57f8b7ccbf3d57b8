//! Content recommendations: keyword ideas the site does not rank for yet,
//! turned into prioritised article suggestions.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::clients::{KeywordProvider, ProviderError};
use crate::constants::limits;
use crate::models::keyword::{KeywordData, Locale, SearchIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pillar,
    Supporting,
    Comparison,
    Guide,
    Listicle,
}

impl ContentType {
    #[must_use]
    pub const fn for_keyword(intent: SearchIntent, search_volume: i64) -> Self {
        match intent {
            SearchIntent::Commercial => Self::Comparison,
            SearchIntent::Transactional => Self::Guide,
            SearchIntent::Informational if search_volume > 1000 => Self::Pillar,
            SearchIntent::Informational | SearchIntent::Navigational => Self::Supporting,
        }
    }

    #[must_use]
    pub const fn estimated_word_count(self) -> u32 {
        match self {
            Self::Pillar => 2500,
            Self::Supporting => 1200,
            Self::Comparison | Self::Listicle => 1800,
            Self::Guide => 1500,
        }
    }

    #[must_use]
    pub fn title(self, keyword: &str) -> String {
        let kw = capitalize_first(keyword);
        match self {
            Self::Pillar => format!("The Complete Guide to {kw}"),
            Self::Comparison => format!("{kw}: Best Options Compared"),
            Self::Guide => format!("How to {kw}: A Step-by-Step Guide"),
            Self::Listicle => format!("Top {kw} You Should Know About"),
            Self::Supporting => format!("{kw}: What You Need to Know"),
        }
    }

    #[must_use]
    pub fn brief(self, keyword: &str) -> String {
        match self {
            Self::Pillar => format!(
                "Create a comprehensive, in-depth guide covering all aspects of \"{keyword}\". \
                 Include sections for beginners and advanced users. Target 2000+ words with rich \
                 media, examples, and actionable takeaways. This should be the definitive resource \
                 on the topic."
            ),
            Self::Supporting => format!(
                "Write a focused article on \"{keyword}\" that supports your pillar content. \
                 Target 1000-1500 words. Include specific examples, data points, and link back to \
                 the main topic pillar page."
            ),
            Self::Comparison => format!(
                "Create a detailed comparison or review article for \"{keyword}\". Include \
                 pros/cons, pricing, features, and a clear recommendation. Target 1500-2000 words \
                 with comparison tables."
            ),
            Self::Guide => format!(
                "Write a step-by-step practical guide for \"{keyword}\". Focus on actionable \
                 steps, screenshots/examples, and clear outcomes. Target 1200-1800 words."
            ),
            Self::Listicle => format!(
                "Create a curated list article for \"{keyword}\". Include 10-15 items with brief \
                 descriptions and links. Target 1500-2000 words."
            ),
        }
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// `min(100, round(volume / 500 * (100 - difficulty) / 100 * 50))`, never negative.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn recommendation_score(search_volume: i64, keyword_difficulty: i64) -> i64 {
    let raw = (search_volume as f64 / 500.0) * ((100 - keyword_difficulty) as f64 / 100.0) * 50.0;
    (raw.round() as i64).clamp(0, 100)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendParams {
    pub domain: String,
    pub focus_topics: Vec<String>,
    pub limit: usize,
    pub country: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: usize,
    pub title: String,
    pub target_keyword: String,
    pub search_volume: i64,
    pub keyword_difficulty: i64,
    pub search_intent: SearchIntent,
    pub content_type: ContentType,
    pub estimated_word_count: u32,
    pub brief: String,
    pub opportunity_score: i64,
    pub cpc: f64,
}

impl From<KeywordData> for Recommendation {
    fn from(k: KeywordData) -> Self {
        let content_type = ContentType::for_keyword(k.search_intent, k.search_volume);
        Self {
            priority: 0,
            title: content_type.title(&k.keyword),
            brief: content_type.brief(&k.keyword),
            opportunity_score: recommendation_score(k.search_volume, k.keyword_difficulty),
            estimated_word_count: content_type.estimated_word_count(),
            content_type,
            target_keyword: k.keyword,
            search_volume: k.search_volume,
            keyword_difficulty: k.keyword_difficulty,
            search_intent: k.search_intent,
            cpc: k.cpc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentPlan {
    pub domain: String,
    pub existing_keywords: usize,
    pub recommendations: Vec<Recommendation>,
    pub total_recommendations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Keeps suggestions the site does not already rank for and that have search
/// volume, scores them and assigns priorities 1..=n after truncating to `limit`.
#[must_use]
pub fn rank_recommendations(
    suggestions: Vec<KeywordData>,
    existing: &HashSet<String>,
    limit: usize,
) -> Vec<Recommendation> {
    let mut seen = HashSet::new();
    let mut recommendations: Vec<Recommendation> = suggestions
        .into_iter()
        .filter(|k| k.search_volume > 0)
        .filter(|k| {
            let key = k.keyword.to_lowercase();
            !key.is_empty() && !existing.contains(&key) && seen.insert(key)
        })
        .map(Recommendation::from)
        .collect();

    recommendations.sort_by(|a, b| b.opportunity_score.cmp(&a.opportunity_score));
    recommendations.truncate(limit);
    for (i, rec) in recommendations.iter_mut().enumerate() {
        rec.priority = i + 1;
    }
    recommendations
}

pub struct ContentRecommender {
    provider: Arc<dyn KeywordProvider>,
}

impl ContentRecommender {
    #[must_use]
    pub fn new(provider: Arc<dyn KeywordProvider>) -> Self {
        Self { provider }
    }

    pub async fn recommend(&self, params: &RecommendParams) -> Result<ContentPlan, ProviderError> {
        let locale = Locale::resolve(&params.country, &params.language);

        let ranked = self
            .provider
            .ranked_keywords(
                &params.domain,
                &locale,
                limits::RECOMMEND_EXISTING_KEYWORDS,
            )
            .await?;
        let existing: HashSet<String> = ranked.iter().map(|k| k.keyword.to_lowercase()).collect();

        let seeds: Vec<String> = if params.focus_topics.is_empty() {
            ranked
                .iter()
                .filter(|k| !k.keyword.is_empty())
                .take(limits::RECOMMEND_SEED_COUNT)
                .map(|k| k.keyword.clone())
                .collect()
        } else {
            params.focus_topics.clone()
        };

        if seeds.is_empty() {
            return Ok(ContentPlan {
                domain: params.domain.clone(),
                existing_keywords: ranked.len(),
                recommendations: vec![],
                total_recommendations: 0,
                message: Some(
                    "No ranking keywords found. Provide focus_topics to get recommendations."
                        .to_string(),
                ),
            });
        }

        let suggestions = self
            .provider
            .keyword_suggestions(&seeds, &locale, limits::RECOMMEND_SUGGESTIONS)
            .await?;

        let recommendations = rank_recommendations(suggestions, &existing, params.limit);

        Ok(ContentPlan {
            domain: params.domain.clone(),
            existing_keywords: ranked.len(),
            total_recommendations: recommendations.len(),
            recommendations,
            message: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(keyword: &str, volume: i64, difficulty: i64, intent: SearchIntent) -> KeywordData {
        KeywordData {
            keyword: keyword.to_string(),
            search_volume: volume,
            keyword_difficulty: difficulty,
            cpc: 1.5,
            competition: 0.3,
            competition_level: "MEDIUM".to_string(),
            search_intent: intent,
            monthly_searches: vec![],
        }
    }

    #[test]
    fn test_content_type_rules() {
        use SearchIntent::*;
        assert_eq!(ContentType::for_keyword(Commercial, 50), ContentType::Comparison);
        assert_eq!(ContentType::for_keyword(Transactional, 5000), ContentType::Guide);
        assert_eq!(ContentType::for_keyword(Informational, 1001), ContentType::Pillar);
        assert_eq!(ContentType::for_keyword(Informational, 1000), ContentType::Supporting);
        assert_eq!(ContentType::for_keyword(Navigational, 9000), ContentType::Supporting);
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            ContentType::Pillar.title("content marketing"),
            "The Complete Guide to Content marketing"
        );
        assert_eq!(
            ContentType::Comparison.title("crm software"),
            "Crm software: Best Options Compared"
        );
        assert_eq!(
            ContentType::Guide.title("start a blog"),
            "How to Start a blog: A Step-by-Step Guide"
        );
        assert_eq!(
            ContentType::Listicle.title("seo tools"),
            "Top Seo tools You Should Know About"
        );
        assert_eq!(
            ContentType::Supporting.title("écrire"),
            "Écrire: What You Need to Know"
        );
        assert_eq!(ContentType::Supporting.title(""), ": What You Need to Know");
    }

    #[test]
    fn test_word_count_and_brief() {
        assert_eq!(ContentType::Pillar.estimated_word_count(), 2500);
        assert_eq!(ContentType::Listicle.estimated_word_count(), 1800);
        assert!(ContentType::Guide.brief("x").contains("step-by-step practical guide for \"x\""));
    }

    #[test]
    fn test_recommendation_score() {
        // 1000 / 500 * 0.6 * 50 = 60
        assert_eq!(recommendation_score(1000, 40), 60);
        assert_eq!(recommendation_score(100_000, 0), 100);
        assert_eq!(recommendation_score(10, 90), 0);
    }

    #[test]
    fn test_rank_recommendations() {
        let existing: HashSet<String> = ["already ranked".to_string()].into_iter().collect();
        let suggestions = vec![
            kw("Already Ranked", 5000, 10, SearchIntent::Informational),
            kw("no volume", 0, 10, SearchIntent::Informational),
            kw("small win", 200, 20, SearchIntent::Informational),
            kw("big win", 3000, 30, SearchIntent::Commercial),
            kw("big win", 3000, 30, SearchIntent::Commercial),
            kw("medium win", 900, 10, SearchIntent::Transactional),
        ];

        let recs = rank_recommendations(suggestions, &existing, 2);

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].target_keyword, "big win");
        assert_eq!(recs[0].priority, 1);
        assert_eq!(recs[0].content_type, ContentType::Comparison);
        assert_eq!(recs[1].target_keyword, "medium win");
        assert_eq!(recs[1].priority, 2);
        assert!((recs[0].cpc - 1.5).abs() < f64::EPSILON);
    }
}
