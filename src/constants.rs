pub const USER_AGENT: &str = "AgenticPencil/1.0";

pub mod cache {

    pub const KEYWORD_RESEARCH_TTL_HOURS: i64 = 24;
}

pub mod billing {

    pub const CREDIT_WINDOW_DAYS: i64 = 30;

    pub const WEBHOOK_TOLERANCE_SECONDS: i64 = 300;
}

pub mod credits {

    pub const KEYWORD_RESEARCH: i64 = 5;

    pub const KEYWORD_GAPS: i64 = 10;

    pub const CONTENT_AUDIT: i64 = 15;

    pub const CONTENT_RECOMMEND: i64 = 10;

    pub const DEFAULT_ENDPOINT: i64 = 5;

    /// Credits charged for a metered path. `/v1/usage` is free.
    #[must_use]
    pub fn endpoint_cost(path: &str) -> i64 {
        match path.trim_end_matches('/') {
            "/v1/keywords/research" => KEYWORD_RESEARCH,
            "/v1/keywords/gaps" => KEYWORD_GAPS,
            "/v1/content/audit" => CONTENT_AUDIT,
            "/v1/content/recommend" => CONTENT_RECOMMEND,
            "/v1/usage" => 0,
            _ => DEFAULT_ENDPOINT,
        }
    }
}

pub mod rate_limit {

    pub const WINDOW_SECONDS: i64 = 60;

    pub const RETENTION_MINUTES: i64 = 60;
}

pub mod keys {

    pub const PREFIX: &str = "ap_";

    /// Random bytes behind the `ap_` prefix (hex encoded to 32 chars).
    pub const RANDOM_BYTES: usize = 16;

    pub const DISPLAY_PREFIX_LEN: usize = 12;

    pub const DEFAULT_NAME: &str = "Default";
}

pub mod audit {

    pub const FETCH_CONCURRENCY: usize = 10;

    pub const THIN_CONTENT_WORDS: usize = 300;

    pub const MAX_CANNIBALIZATION_RISKS: usize = 20;

    pub const MIN_TITLE_TOKEN_LEN: usize = 4;
}

pub mod limits {

    pub const DEFAULT_RESEARCH_LIMIT: u32 = 50;

    pub const MAX_RESEARCH_LIMIT: u32 = 1000;

    pub const DEFAULT_RECOMMEND_LIMIT: u32 = 20;

    pub const MAX_RECOMMEND_LIMIT: u32 = 100;

    pub const DEFAULT_AUDIT_PAGES: u32 = 100;

    pub const MAX_AUDIT_PAGES: u32 = 500;

    pub const MAX_COMPETITORS: usize = 3;

    pub const GAP_RESULTS: u32 = 100;

    pub const RECOMMEND_EXISTING_KEYWORDS: u32 = 100;

    pub const RECOMMEND_SEED_COUNT: usize = 5;

    pub const RECOMMEND_SUGGESTIONS: u32 = 100;

    pub const RECENT_USAGE_CALLS: u64 = 20;
}
