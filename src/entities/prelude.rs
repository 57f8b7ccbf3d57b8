pub use super::api_keys::Entity as ApiKeys;
pub use super::cached_results::Entity as CachedResults;
pub use super::profiles::Entity as Profiles;
pub use super::rate_limits::Entity as RateLimits;
pub use super::usage_logs::Entity as UsageLogs;
