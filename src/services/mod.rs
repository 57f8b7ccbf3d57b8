pub mod accounts;
pub use accounts::{AccountError, AccountService};

pub mod audit;
pub use audit::{AuditError, ContentAuditor};

pub mod billing;
pub use billing::{BillingError, BillingService};

pub mod gaps;
pub use gaps::GapAnalyzer;

pub mod keywords;
pub use keywords::KeywordResearchService;

pub mod metering;
pub use metering::{CreditLedger, MeteringError};

pub mod recommend;
pub use recommend::ContentRecommender;

pub mod scheduler;
pub use scheduler::Scheduler;
