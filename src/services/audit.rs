//! Content audit: sitemap discovery, page crawling and on-page analysis.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clients::PageFetcher;
use crate::constants::audit;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn loc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?i)<loc>\s*(.*?)\s*</loc>")
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?is)<title[^>]*>(.*?)</title>")
}

fn meta_description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(
        &RE,
        r#"(?is)<meta[^>]*name=["']description["'][^>]*content=["'](.*?)["']"#,
    )
}

fn h1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?is)<h1[^>]*>(.*?)</h1>")
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?is)<script[^>]*>.*?</script>")
}

fn style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"(?is)<style[^>]*>.*?</style>")
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"<[^>]+>")
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("no crawlable URLs found for {0}")]
    NoUrls(String),

    #[error("failed to fetch sitemap {url}: {source}")]
    Sitemap {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditParams {
    pub domain: String,
    pub sitemap_url: Option<String>,
    pub max_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub h1: String,
    pub word_count: usize,
    /// 0 when the page could not be fetched
    pub status_code: u16,
}

impl PageInfo {
    #[must_use]
    pub fn unreachable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            meta_description: String::new(),
            h1: String::new(),
            word_count: 0,
            status_code: 0,
        }
    }

    #[must_use]
    pub const fn is_thin(&self) -> bool {
        self.word_count > 0 && self.word_count < audit::THIN_CONTENT_WORDS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub const fn for_page_count(pages: usize) -> Self {
        if pages > 3 {
            Self::High
        } else if pages > 2 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CannibalizationRisk {
    pub keyword: String,
    pub pages: Vec<String>,
    pub severity: Severity,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total_pages: usize,
    pub thin_pages: usize,
    pub cannibalization_issues: usize,
    pub avg_word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub domain: String,
    pub pages_crawled: usize,
    pub pages: Vec<PageInfo>,
    pub thin_content: Vec<PageInfo>,
    pub cannibalization_risks: Vec<CannibalizationRisk>,
    pub summary: AuditSummary,
}

/// `<loc>` values of a sitemap or sitemap index, in document order.
#[must_use]
pub fn extract_locs(xml: &str) -> Vec<String> {
    loc_re()
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).trim().to_string())
        .filter(|u| !u.is_empty())
        .collect()
}

fn first_capture(re: &Regex, html: &str) -> String {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).trim().to_string())
        .unwrap_or_default()
}

/// Visible word count after dropping scripts, styles and markup.
#[must_use]
pub fn count_words(html: &str) -> usize {
    let without_scripts = script_re().replace_all(html, " ");
    let without_styles = style_re().replace_all(&without_scripts, " ");
    let text = tag_re().replace_all(&without_styles, " ");
    text.split_whitespace().count()
}

#[must_use]
pub fn parse_page(url: &str, status_code: u16, html: &str) -> PageInfo {
    let h1 = h1_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| {
            let stripped = tag_re().replace_all(m.as_str(), "");
            html_escape::decode_html_entities(&stripped).trim().to_string()
        })
        .unwrap_or_default();

    PageInfo {
        url: url.to_string(),
        title: first_capture(title_re(), html),
        meta_description: first_capture(meta_description_re(), html),
        h1,
        word_count: count_words(html),
        status_code,
    }
}

fn title_tokens(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ':' | ','))
        .filter(|w| w.chars().count() >= audit::MIN_TITLE_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Title terms shared by more than one page, most severe first.
#[must_use]
pub fn detect_cannibalization(pages: &[PageInfo]) -> Vec<CannibalizationRisk> {
    let mut order: Vec<String> = Vec::new();
    let mut by_token: HashMap<String, Vec<String>> = HashMap::new();

    for page in pages {
        for token in title_tokens(&page.title) {
            let urls = by_token.entry(token.clone()).or_insert_with(|| {
                order.push(token);
                Vec::new()
            });
            if !urls.contains(&page.url) {
                urls.push(page.url.clone());
            }
        }
    }

    let mut risks: Vec<CannibalizationRisk> = order
        .into_iter()
        .filter_map(|keyword| {
            let urls = by_token.remove(&keyword)?;
            (urls.len() > 1).then(|| CannibalizationRisk {
                severity: Severity::for_page_count(urls.len()),
                recommendation: format!(
                    "{} pages target \"{keyword}\". Consider consolidating or differentiating content.",
                    urls.len()
                ),
                keyword,
                pages: urls,
            })
        })
        .collect();

    risks.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.pages.len().cmp(&a.pages.len()))
    });
    risks.truncate(audit::MAX_CANNIBALIZATION_RISKS);
    risks
}

#[must_use]
pub fn build_report(domain: &str, pages: Vec<PageInfo>) -> AuditReport {
    let thin_content: Vec<PageInfo> = pages.iter().filter(|p| p.is_thin()).cloned().collect();
    let cannibalization_risks = detect_cannibalization(&pages);

    let total_words: usize = pages.iter().map(|p| p.word_count).sum();
    let avg_word_count = if pages.is_empty() {
        0
    } else {
        (total_words + pages.len() / 2) / pages.len()
    };

    AuditReport {
        domain: domain.to_string(),
        pages_crawled: pages.len(),
        summary: AuditSummary {
            total_pages: pages.len(),
            thin_pages: thin_content.len(),
            cannibalization_issues: cannibalization_risks.len(),
            avg_word_count,
        },
        pages,
        thin_content,
        cannibalization_risks,
    }
}

pub struct ContentAuditor {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
}

impl ContentAuditor {
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Page URLs listed in a sitemap. Nested sitemaps (`.xml` locations) are
    /// expanded one level; unreachable nested sitemaps are skipped.
    async fn sitemap_urls(&self, sitemap_url: &str) -> anyhow::Result<Vec<String>> {
        let sitemap = self.fetcher.fetch(sitemap_url).await?;
        if !sitemap.is_success() {
            debug!(sitemap_url, status = sitemap.status, "Sitemap not available");
            return Ok(Vec::new());
        }

        let mut urls = Vec::new();
        for loc in extract_locs(&sitemap.body) {
            if !loc.ends_with(".xml") {
                urls.push(loc);
                continue;
            }

            match self.fetcher.fetch(&loc).await {
                Ok(nested) if nested.is_success() => {
                    urls.extend(
                        extract_locs(&nested.body)
                            .into_iter()
                            .filter(|u| !u.ends_with(".xml")),
                    );
                }
                Ok(nested) => debug!(sitemap = %loc, status = nested.status, "Nested sitemap not available"),
                Err(e) => debug!(sitemap = %loc, error = %e, "Nested sitemap fetch failed"),
            }
        }

        Ok(urls)
    }

    async fn discover_urls(&self, params: &AuditParams) -> Result<Vec<String>, AuditError> {
        if let Some(sitemap_url) = &params.sitemap_url {
            return self
                .sitemap_urls(sitemap_url)
                .await
                .map_err(|source| AuditError::Sitemap {
                    url: sitemap_url.clone(),
                    source,
                });
        }

        let candidates = [
            format!("https://{}/sitemap.xml", params.domain),
            format!("https://www.{}/sitemap.xml", params.domain),
            format!("https://{}/sitemap_index.xml", params.domain),
        ];

        for candidate in &candidates {
            match self.sitemap_urls(candidate).await {
                Ok(urls) if !urls.is_empty() => return Ok(urls),
                Ok(_) => {}
                Err(e) => debug!(sitemap = %candidate, error = %e, "Sitemap candidate failed"),
            }
        }

        Ok(Vec::new())
    }

    async fn fetch_page(&self, url: String) -> PageInfo {
        match self.fetcher.fetch(&url).await {
            Ok(page) => parse_page(&url, page.status, &page.body),
            Err(e) => {
                debug!(url = %url, error = %e, "Page fetch failed");
                PageInfo::unreachable(&url)
            }
        }
    }

    /// Crawls up to `max_pages` sitemap URLs with a bounded number of fetches
    /// in flight. Individual page failures never fail the audit.
    pub async fn audit(&self, params: &AuditParams) -> Result<AuditReport, AuditError> {
        let mut seen = HashSet::new();
        let urls: Vec<String> = self
            .discover_urls(params)
            .await?
            .into_iter()
            .filter(|u| seen.insert(u.clone()))
            .take(params.max_pages)
            .collect();

        if urls.is_empty() {
            warn!(domain = %params.domain, "Content audit found no URLs");
            return Err(AuditError::NoUrls(params.domain.clone()));
        }

        let pages: Vec<PageInfo> = stream::iter(urls)
            .map(|url| self.fetch_page(url))
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(build_report(&params.domain, pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, title: &str, words: usize) -> PageInfo {
        PageInfo {
            url: url.to_string(),
            title: title.to_string(),
            meta_description: String::new(),
            h1: String::new(),
            word_count: words,
            status_code: 200,
        }
    }

    #[test]
    fn test_extract_locs() {
        let xml = r"<urlset>
            <url><loc> https://example.com/a </loc></url>
            <url><LOC>https://example.com/b?x=1&amp;y=2</LOC></url>
            <sitemap><loc>https://example.com/posts.xml</loc></sitemap>
        </urlset>";

        assert_eq!(
            extract_locs(xml),
            vec![
                "https://example.com/a",
                "https://example.com/b?x=1&y=2",
                "https://example.com/posts.xml"
            ]
        );
    }

    #[test]
    fn test_parse_page() {
        let html = r#"<html><head>
            <title>
              Rust &amp; SEO Guide
            </title>
            <meta name="description" content="Learn things">
            <style>body { color: red; }</style>
            <script>var words = "not counted here";</script>
            </head><body>
            <h1 class="big">The <em>Best</em> Guide</h1>
            <p>One two three four.</p>
            </body></html>"#;

        let info = parse_page("https://example.com/", 200, html);
        assert_eq!(info.title, "Rust & SEO Guide");
        assert_eq!(info.meta_description, "Learn things");
        assert_eq!(info.h1, "The Best Guide");
        assert_eq!(info.status_code, 200);
        // title (4) + h1 (3) + paragraph (4)
        assert_eq!(info.word_count, 11);
    }

    #[test]
    fn test_count_words_empty() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("<div><span></span></div>"), 0);
    }

    #[test]
    fn test_thin_content_excludes_empty_pages() {
        assert!(page("a", "", 120).is_thin());
        assert!(!page("a", "", 0).is_thin());
        assert!(!page("a", "", 300).is_thin());
        assert!(!PageInfo::unreachable("a").is_thin());
    }

    #[test]
    fn test_detect_cannibalization() {
        let pages = vec![
            page("/1", "Keyword Research Guide", 500),
            page("/2", "Keyword Research Tools | Blog", 500),
            page("/3", "Advanced keyword tips", 500),
            page("/4", "Keyword: the basics, again", 500),
            page("/5", "Unrelated post", 500),
        ];

        let risks = detect_cannibalization(&pages);

        assert_eq!(risks[0].keyword, "keyword");
        assert_eq!(risks[0].pages.len(), 4);
        assert_eq!(risks[0].severity, Severity::High);
        assert_eq!(
            risks[0].recommendation,
            "4 pages target \"keyword\". Consider consolidating or differentiating content."
        );

        let research = risks.iter().find(|r| r.keyword == "research").unwrap();
        assert_eq!(research.severity, Severity::Low);

        // "blog" and "tips" appear once; short words are ignored
        assert!(risks.iter().all(|r| r.pages.len() > 1));
        assert!(risks.iter().all(|r| r.keyword.chars().count() > 3));
    }

    #[test]
    fn test_same_page_counted_once_per_keyword() {
        let pages = vec![page("/1", "Guide to the guide", 500)];
        assert!(detect_cannibalization(&pages).is_empty());
    }

    #[test]
    fn test_risks_capped_at_twenty() {
        let pages: Vec<PageInfo> = (0..2)
            .map(|i| {
                let title = (0..30).map(|w| format!("word{w:02}")).collect::<Vec<_>>().join(" ");
                page(&format!("/{i}"), &title, 100)
            })
            .collect();

        assert_eq!(detect_cannibalization(&pages).len(), 20);
    }

    #[test]
    fn test_build_report_summary() {
        let pages = vec![
            page("/a", "Alpha", 100),
            page("/b", "Beta", 1000),
            PageInfo::unreachable("/c"),
        ];

        let report = build_report("example.com", pages);
        assert_eq!(report.pages_crawled, 3);
        assert_eq!(report.summary.thin_pages, 1);
        assert_eq!(report.thin_content[0].url, "/a");
        assert_eq!(report.summary.avg_word_count, 367);
    }
}
