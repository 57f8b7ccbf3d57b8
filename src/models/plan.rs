use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription tier attached to every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    #[default]
    Free,
    Pro,
    Scale,
    Enterprise,
}

impl PlanId {
    pub const ALL: [Self; 4] = [Self::Free, Self::Pro, Self::Scale, Self::Enterprise];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Scale => "scale",
            Self::Enterprise => "enterprise",
        }
    }

    /// Stored plan identifiers that no longer exist fall back to `Free`.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
            Self::Scale => "Scale",
            Self::Enterprise => "Enterprise",
        }
    }

    /// Monthly credit allowance. `None` means unlimited.
    #[must_use]
    pub const fn credit_limit(self) -> Option<i64> {
        match self {
            Self::Free => Some(50),
            Self::Pro => Some(1000),
            Self::Scale => Some(5000),
            Self::Enterprise => None,
        }
    }

    /// Requests per minute per API key.
    #[must_use]
    pub const fn rate_limit(self) -> u32 {
        match self {
            Self::Free => 10,
            Self::Pro => 60,
            Self::Scale => 120,
            Self::Enterprise => 300,
        }
    }

    /// Monthly price in cents. `None` means custom pricing.
    #[must_use]
    pub const fn price_cents(self) -> Option<i64> {
        match self {
            Self::Free => Some(0),
            Self::Pro => Some(4900),
            Self::Scale => Some(19900),
            Self::Enterprise => None,
        }
    }

    /// Plans that can be bought through self-serve checkout.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::Pro | Self::Scale)
    }

    #[must_use]
    pub const fn features(self) -> &'static [&'static str] {
        match self {
            Self::Free => &[
                "50 credits/month",
                "Keyword research",
                "Content audit",
                "Community support",
            ],
            Self::Pro => &[
                "1,000 credits/month",
                "All endpoints",
                "Content recommendations",
                "Priority support",
            ],
            Self::Scale => &[
                "5,000 credits/month",
                "All endpoints",
                "Dedicated support",
                "Custom integrations",
            ],
            Self::Enterprise => &[
                "Unlimited credits",
                "All endpoints",
                "SLA",
                "White-label",
            ],
        }
    }

    #[must_use]
    pub fn credits_remaining(self, credits_used: i64) -> Option<i64> {
        self.credit_limit().map(|limit| (limit - credits_used).max(0))
    }
}

impl FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "scale" => Ok(Self::Scale),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("Unknown plan: {other}")),
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
