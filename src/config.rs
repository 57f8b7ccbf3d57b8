use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub dataforseo: DataForSeoConfig,

    pub stripe: StripeConfig,

    pub telegram: TelegramConfig,

    pub audit: AuditConfig,

    pub cache: CacheConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `sqlite:` path or `postgres://` URL
    pub database_url: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 4)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 10)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,

    /// Linked from usage responses
    pub upgrade_url: String,

    pub docs_url: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/agenticpencil.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 4,
            max_db_connections: 10,
            min_db_connections: 1,
            upgrade_url: "https://platform.agenticpencil.com/billing".to_string(),
            docs_url: "https://docs.agenticpencil.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_allowed_origins: vec![
                "https://agenticpencil.com".to_string(),
                "https://platform.agenticpencil.com".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataForSeoConfig {
    pub base_url: String,

    pub login: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,

    pub request_timeout_seconds: u64,
}

impl Default for DataForSeoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dataforseo.com/v3".to_string(),
            login: String::new(),
            password: String::new(),
            request_timeout_seconds: 60,
        }
    }
}

impl DataForSeoConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.login.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    pub api_base: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_key: String,

    /// When set, webhook payloads must carry a valid `Stripe-Signature`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,

    pub webhook_tolerance_seconds: i64,

    pub success_url: String,

    pub cancel_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.stripe.com/v1".to_string(),
            secret_key: String::new(),
            webhook_secret: None,
            webhook_tolerance_seconds: crate::constants::billing::WEBHOOK_TOLERANCE_SECONDS,
            success_url:
                "https://platform.agenticpencil.com/billing/success?session_id={CHECKOUT_SESSION_ID}"
                    .to_string(),
            cancel_url: "https://platform.agenticpencil.com/billing/cancel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Pages fetched in parallel during a crawl
    pub fetch_concurrency: usize,

    pub request_timeout_seconds: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: crate::constants::audit::FETCH_CONCURRENCY,
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub keyword_research_ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keyword_research_ttl_hours: crate::constants::cache::KEYWORD_RESEARCH_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Six-field cron expression (seconds first)
    pub cleanup_cron: String,

    /// Rate-limit windows older than this are deleted
    pub rate_limit_retention_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_cron: "0 */10 * * * *".to_string(),
            rate_limit_retention_minutes: crate::constants::rate_limit::RETENTION_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub json_logs: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "agenticpencil".to_string());

        Self {
            metrics_enabled: true,
            json_logs: false,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("agenticpencil").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".agenticpencil").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Secrets and deployment settings are read from the environment and take
    /// precedence over the config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("DATABASE_URL") {
            self.general.database_url = url;
        }
        if let Some(login) = var("DATAFORSEO_LOGIN") {
            self.dataforseo.login = login;
        }
        if let Some(password) = var("DATAFORSEO_PASSWORD") {
            self.dataforseo.password = password;
        }
        if let Some(key) = var("STRIPE_SECRET_KEY") {
            self.stripe.secret_key = key;
        }
        if let Some(secret) = var("STRIPE_WEBHOOK_SECRET") {
            self.stripe.webhook_secret = Some(secret);
        }
        if let Some(token) = var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        if self.audit.fetch_concurrency == 0 {
            anyhow::bail!("Audit fetch concurrency must be > 0");
        }

        if self.cache.keyword_research_ttl_hours <= 0 {
            anyhow::bail!("Keyword research cache TTL must be > 0 hours");
        }

        if self.scheduler.enabled && self.scheduler.cleanup_cron.trim().is_empty() {
            anyhow::bail!("Scheduler cleanup cron must be set when the scheduler is enabled");
        }

        if self.stripe.webhook_tolerance_seconds <= 0 {
            anyhow::bail!("Stripe webhook tolerance must be > 0 seconds");
        }

        if self.telegram.bot_token.is_some() != self.telegram.chat_id.is_some() {
            anyhow::bail!("Telegram bot token and chat id must be configured together");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.audit.fetch_concurrency, 10);
        assert_eq!(config.cache.keyword_research_ttl_hours, 24);
        assert_eq!(config.dataforseo.base_url, "https://api.dataforseo.com/v3");
        assert!(config.stripe.webhook_secret.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[dataforseo]"));
        assert!(toml_str.contains("[scheduler]"));
        assert!(!toml_str.contains("password"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [audit]
            fetch_concurrency = 4
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.audit.fetch_concurrency, 4);

        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://localhost/ap"),
            ("DATAFORSEO_LOGIN", "login"),
            ("DATAFORSEO_PASSWORD", "secret"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_test"),
            ("PORT", "8080"),
            ("TELEGRAM_BOT_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.general.database_url, "postgres://localhost/ap");
        assert!(config.dataforseo.is_configured());
        assert_eq!(config.stripe.webhook_secret.as_deref(), Some("whsec_test"));
        assert_eq!(config.server.port, 8080);
        assert!(config.telegram.bot_token.is_none());
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_validate_rejects_half_configured_telegram() {
        let mut config = Config::default();
        config.telegram.bot_token = Some("token".to_string());
        assert!(config.validate().is_err());

        config.telegram.chat_id = Some("42".to_string());
        assert!(config.validate().is_ok());
    }
}
