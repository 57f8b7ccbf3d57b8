use axum::{Json, extract::rejection::JsonRejection};

use super::ApiError;

/// Unwraps a JSON body, turning extractor rejections into `VALIDATION_ERROR`.
pub fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::validation(format!("Invalid request body: {}", rejection.body_text()))
    })
}

/// Accepts bare hosts as well as pasted URLs: `https://www.Example.com/blog/`
/// becomes `www.example.com`.
pub fn normalize_domain(raw: Option<&str>) -> Result<String, ApiError> {
    let trimmed = raw.map(str::trim).unwrap_or_default();

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    if host.is_empty() {
        return Err(ApiError::validation("domain is required"));
    }

    if host.chars().any(char::is_whitespace) {
        return Err(ApiError::validation(format!("Invalid domain: {host}")));
    }

    Ok(host)
}

pub fn validate_range<T>(name: &str, value: T, min: T, max: T) -> Result<T, ApiError>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ApiError::validation(format!(
            "Invalid {name}: {value}. Must be between {min} and {max}"
        )));
    }
    Ok(value)
}

/// Trims entries and drops blanks.
pub fn clean_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub fn locale_code(raw: Option<String>, default: &str) -> String {
    raw.map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain(Some("example.com")).unwrap(), "example.com");
        assert_eq!(
            normalize_domain(Some("  https://www.Example.com/blog/?x=1 ")).unwrap(),
            "www.example.com"
        );
        assert_eq!(normalize_domain(Some("http://example.com")).unwrap(), "example.com");
        assert!(normalize_domain(None).is_err());
        assert!(normalize_domain(Some("   ")).is_err());
        assert!(normalize_domain(Some("https://")).is_err());
        assert!(normalize_domain(Some("exa mple.com")).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert_eq!(validate_range("limit", 50, 1, 1000).unwrap(), 50);
        assert!(validate_range("limit", 1, 1, 1000).is_ok());
        assert!(validate_range("limit", 1000, 1, 1000).is_ok());
        assert!(validate_range("limit", 0, 1, 1000).is_err());
        assert!(validate_range("limit", 1001, 1, 1000).is_err());
    }

    #[test]
    fn test_clean_list_and_locale() {
        let cleaned = clean_list(Some(vec![" seo ".into(), String::new(), "  ".into()]));
        assert_eq!(cleaned, vec!["seo".to_string()]);
        assert!(clean_list(None).is_empty());

        assert_eq!(locale_code(None, "us"), "us");
        assert_eq!(locale_code(Some(" GB ".into()), "us"), "gb");
        assert_eq!(locale_code(Some(String::new()), "en"), "en");
    }
}
