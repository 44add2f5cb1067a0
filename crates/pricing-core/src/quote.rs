//! Quotes
//!
//! Priced results. A quote is either a single point estimate or a range;
//! whitelisting figures exist only on quotes priced for PRO callers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Computation path chosen from the signals that were available
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveMode {
    /// Followers and views: the higher of the two valuations
    Full,
    /// Follower floor only
    FollowersOnly,
    /// Views valuation only
    ViewsOnly,
}

impl EffectiveMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::FollowersOnly => "followers_only",
            Self::ViewsOnly => "views_only",
        }
    }
}

impl std::fmt::Display for EffectiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context shared by every quote shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteBasis {
    pub mode: EffectiveMode,

    /// Normalized platform key, as supplied (even when unknown)
    pub platform: String,

    /// Normalized niche key, as supplied (even when unknown)
    pub niche: String,

    pub followers: Option<u64>,

    pub avg_views: Option<u64>,

    pub engagement_rate: Option<f64>,

    /// Usage-rights duration the price includes
    pub usage_months: u32,

    pub is_pro: bool,

    /// Currency of the local amounts
    pub currency: String,
}

/// PRO-only whitelisting figures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistQuote {
    /// Price including paid-ad rights, local currency
    pub amount: u64,

    /// USD equivalent of `amount`
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_usd: Decimal,
}

/// Point estimate with a walk-away minimum
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleQuote {
    pub basis: QuoteBasis,

    pub recommended_amount: u64,

    /// Never advise accepting less than this
    pub minimum_amount: u64,

    #[serde(with = "rust_decimal::serde::float")]
    pub recommended_amount_usd: Decimal,

    pub whitelist: Option<WhitelistQuote>,
}

/// Negotiation band around the point estimate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeQuote {
    pub basis: QuoteBasis,

    pub range_low: u64,

    /// Equal to the single-mode recommended amount
    pub range_mid: u64,

    pub range_high: u64,

    /// USD equivalent of `range_mid`
    #[serde(with = "rust_decimal::serde::float")]
    pub range_mid_usd: Decimal,

    pub whitelist: Option<WhitelistQuote>,
}

/// Result of a pricing call, tagged by output shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Quote {
    Single(SingleQuote),
    Range(RangeQuote),
}

impl Quote {
    pub const fn basis(&self) -> &QuoteBasis {
        match self {
            Self::Single(q) => &q.basis,
            Self::Range(q) => &q.basis,
        }
    }

    /// The point estimate, whatever the shape
    pub const fn recommended_amount(&self) -> u64 {
        match self {
            Self::Single(q) => q.recommended_amount,
            Self::Range(q) => q.range_mid,
        }
    }

    pub const fn whitelist(&self) -> Option<&WhitelistQuote> {
        match self {
            Self::Single(q) => q.whitelist.as_ref(),
            Self::Range(q) => q.whitelist.as_ref(),
        }
    }
}

impl From<SingleQuote> for Quote {
    fn from(quote: SingleQuote) -> Self {
        Self::Single(quote)
    }
}

impl From<RangeQuote> for Quote {
    fn from(quote: RangeQuote) -> Self {
        Self::Range(quote)
    }
}
