pub mod api_key;
pub mod cache;
pub mod profile;
pub mod rate_limit;
pub mod usage;
