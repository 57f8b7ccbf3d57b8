pub mod dataforseo;
pub mod pages;
pub mod stripe;
pub mod telegram;

pub use dataforseo::{DataForSeoClient, KeywordProvider, ProviderError};
pub use pages::{FetchedPage, HttpPageFetcher, PageFetcher};
pub use stripe::{PaymentGateway, StripeClient};
pub use telegram::{NotifyLevel, TelegramNotifier};
