pub mod prelude;

pub mod api_keys;
pub mod cached_results;
pub mod profiles;
pub mod rate_limits;
pub mod usage_logs;
