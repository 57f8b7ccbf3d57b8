use serde::{Deserialize, Serialize};

/// Search intent as classified by the keyword provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchIntent {
    #[default]
    Informational,
    Commercial,
    Transactional,
    Navigational,
}

impl SearchIntent {
    /// Missing or unrecognised intents are treated as informational.
    #[must_use]
    pub fn from_provider(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("commercial") => Self::Commercial,
            Some("transactional") => Self::Transactional,
            Some("navigational") => Self::Navigational,
            _ => Self::Informational,
        }
    }
}

/// One keyword with its search metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordData {
    pub keyword: String,
    pub search_volume: i64,
    /// 0-100
    pub keyword_difficulty: i64,
    pub cpc: f64,
    pub competition: f64,
    pub competition_level: String,
    pub search_intent: SearchIntent,
    /// Monthly volumes, most recent first
    pub monthly_searches: Vec<i64>,
}

/// Provider location and language names resolved from short codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub country: String,
    pub location_name: &'static str,
    pub language_name: &'static str,
}

impl Locale {
    /// Unknown codes fall back to United States / English.
    #[must_use]
    pub fn resolve(country: &str, language: &str) -> Self {
        let location_name = match country.to_ascii_lowercase().as_str() {
            "uk" => "United Kingdom",
            "ca" => "Canada",
            "au" => "Australia",
            "de" => "Germany",
            "fr" => "France",
            "es" => "Spain",
            "it" => "Italy",
            "br" => "Brazil",
            "pt" => "Portugal",
            "nl" => "Netherlands",
            "in" => "India",
            "jp" => "Japan",
            "mx" => "Mexico",
            _ => "United States",
        };

        let language_name = match language.to_ascii_lowercase().as_str() {
            "de" => "German",
            "fr" => "French",
            "es" => "Spanish",
            "it" => "Italian",
            "pt" => "Portuguese",
            "nl" => "Dutch",
            "ja" => "Japanese",
            "tr" => "Turkish",
            _ => "English",
        };

        Self {
            country: country.to_ascii_lowercase(),
            location_name,
            language_name,
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::resolve("us", "en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_resolution() {
        let locale = Locale::resolve("DE", "de");
        assert_eq!(locale.location_name, "Germany");
        assert_eq!(locale.language_name, "German");
        assert_eq!(locale.country, "de");

        let fallback = Locale::resolve("zz", "xx");
        assert_eq!(fallback.location_name, "United States");
        assert_eq!(fallback.language_name, "English");
    }

    #[test]
    fn test_intent_fallback() {
        assert_eq!(
            SearchIntent::from_provider(Some("Commercial")),
            SearchIntent::Commercial
        );
        assert_eq!(SearchIntent::from_provider(Some("unknown")), SearchIntent::Informational);
        assert_eq!(SearchIntent::from_provider(None), SearchIntent::Informational);
    }
}
