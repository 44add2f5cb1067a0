//! Pricing Requests
//!
//! Audience signals plus the platform/niche/tier context a quote is priced in.

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Upper bound on follower and view counts accepted by the engine
pub const MAX_AUDIENCE: u64 = 10_000_000_000;

/// Audience-quality signals supplied by the creator
///
/// Zero counts carry no information and are treated as absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AudienceSignals {
    #[serde(default)]
    pub followers: Option<u64>,

    #[serde(default)]
    pub avg_views: Option<u64>,

    /// Engagement rate as a fraction in (0, 1]
    #[serde(default)]
    pub engagement_rate: Option<f64>,
}

impl AudienceSignals {
    pub const fn new(followers: Option<u64>, avg_views: Option<u64>, engagement_rate: Option<f64>) -> Self {
        Self {
            followers,
            avg_views,
            engagement_rate,
        }
    }

    pub const fn followers_only(followers: u64) -> Self {
        Self::new(Some(followers), None, None)
    }

    pub const fn views_only(avg_views: u64, engagement_rate: Option<f64>) -> Self {
        Self::new(None, Some(avg_views), engagement_rate)
    }

    /// Follower count, if it carries a signal
    pub fn followers_signal(&self) -> Option<u64> {
        self.followers.filter(|n| *n > 0)
    }

    /// Average views, if they carry a signal
    pub fn views_signal(&self) -> Option<u64> {
        self.avg_views.filter(|n| *n > 0)
    }

    /// True when at least one audience metric is present
    pub fn has_audience_metric(&self) -> bool {
        self.followers_signal().is_some() || self.views_signal().is_some()
    }

    /// Reject out-of-range values instead of coercing them
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("followers", self.followers), ("avg_views", self.avg_views)] {
            if let Some(n) = value {
                if n > MAX_AUDIENCE {
                    return Err(PricingError::InvalidInput(format!(
                        "{name} must not exceed {MAX_AUDIENCE}"
                    )));
                }
            }
        }

        if let Some(rate) = self.engagement_rate {
            if !rate.is_finite() || rate <= 0.0 || rate > 1.0 {
                return Err(PricingError::InvalidInput(
                    "engagement_rate must be between 0 (exclusive) and 1".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Output shape requested by the caller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    /// Recommended + minimum price
    #[default]
    Single,
    /// Low / mid / high band
    Range,
}

/// Full input to the valuation model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    #[serde(flatten)]
    pub signals: AudienceSignals,

    pub platform: String,

    pub niche: String,

    /// Resolved entitlement of the caller; never computed by the engine
    #[serde(default)]
    pub is_pro: bool,

    #[serde(default)]
    pub mode: OutputShape,
}

impl PricingRequest {
    pub fn new(signals: AudienceSignals, platform: impl Into<String>, niche: impl Into<String>) -> Self {
        Self {
            signals,
            platform: platform.into(),
            niche: niche.into(),
            is_pro: false,
            mode: OutputShape::Single,
        }
    }

    #[must_use]
    pub const fn pro(mut self, is_pro: bool) -> Self {
        self.is_pro = is_pro;
        self
    }

    #[must_use]
    pub const fn shape(mut self, mode: OutputShape) -> Self {
        self.mode = mode;
        self
    }
}
