use std::sync::Arc;

use crate::clients::{
    DataForSeoClient, HttpPageFetcher, KeywordProvider, PageFetcher, PaymentGateway,
    StripeClient, TelegramNotifier,
};
use crate::config::Config;
use crate::constants::USER_AGENT;
use crate::db::Store;
use crate::services::{
    AccountService, BillingService, ContentAuditor, ContentRecommender, CreditLedger,
    GapAnalyzer, KeywordResearchService,
};

/// Build a shared HTTP client with reasonable defaults for outbound calls.
/// Reused across clients so connections are pooled.
pub fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Outbound integrations behind their service traits.
#[derive(Clone)]
pub struct Providers {
    pub keywords: Arc<dyn KeywordProvider>,
    pub pages: Arc<dyn PageFetcher>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl Providers {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_client = build_shared_http_client(config.dataforseo.request_timeout_seconds)?;
        let crawl_client = build_shared_http_client(config.audit.request_timeout_seconds)?;

        Ok(Self {
            keywords: Arc::new(DataForSeoClient::new(api_client.clone(), &config.dataforseo)),
            pages: Arc::new(HttpPageFetcher::new(crawl_client)),
            payments: Arc::new(StripeClient::new(api_client, &config.stripe)),
        })
    }
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub notifier: TelegramNotifier,

    pub accounts: AccountService,

    pub ledger: CreditLedger,

    pub research: Arc<KeywordResearchService>,

    pub gaps: Arc<GapAnalyzer>,

    pub auditor: Arc<ContentAuditor>,

    pub recommender: Arc<ContentRecommender>,

    pub billing: Arc<BillingService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let providers = Providers::from_config(&config)?;
        Self::with_providers(config, providers).await
    }

    pub async fn with_providers(config: Config, providers: Providers) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let notifier = TelegramNotifier::new(build_shared_http_client(10)?, &config.telegram);

        let accounts = AccountService::new(store.clone(), notifier.clone());
        let ledger = CreditLedger::new(store.clone());

        let research = Arc::new(KeywordResearchService::new(
            store.clone(),
            providers.keywords.clone(),
            config.cache.keyword_research_ttl_hours,
        ));
        let gaps = Arc::new(GapAnalyzer::new(providers.keywords.clone()));
        let auditor = Arc::new(ContentAuditor::new(
            providers.pages,
            config.audit.fetch_concurrency,
        ));
        let recommender = Arc::new(ContentRecommender::new(providers.keywords));
        let billing = Arc::new(BillingService::new(
            store.clone(),
            providers.payments,
            notifier.clone(),
            config.stripe.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            notifier,
            accounts,
            ledger,
            research,
            gaps,
            auditor,
            recommender,
            billing,
        })
    }
}
