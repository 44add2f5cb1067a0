//! Paid Plans

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// One-time purchases offered to creators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    /// Unlocks whitelisting pricing, USD rates and deal scripts
    Pro,
    /// Done-for-you deal packaging; does not grant PRO access
    Elite,
}

/// Pricing information
#[derive(Clone, Debug)]
pub struct PlanPricing {
    pub name: &'static str,
    pub description: &'static str,
    /// Charge in kobo (1/100 NGN)
    pub amount_kobo: i64,
    /// Days of PRO entitlement granted per payment
    pub entitlement_days: Option<i64>,
}

impl Plan {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pro => "PRO",
            Self::Elite => "ELITE",
        }
    }

    /// Get pricing for this plan
    pub const fn pricing(&self) -> PlanPricing {
        match self {
            Self::Pro => PlanPricing {
                name: "Creator PRO",
                description: "Whitelisting pricing, USD rates, deal scripts",
                amount_kobo: 1_000_000, // ₦10,000 one-time
                entitlement_days: Some(30),
            },
            Self::Elite => PlanPricing {
                name: "ELITE Deal Packaging",
                description: "Done-for-you brand deal package",
                amount_kobo: 2_500_000, // ₦25,000 per package
                entitlement_days: None,
            },
        }
    }
}

impl FromStr for Plan {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRO" => Ok(Self::Pro),
            "ELITE" => Ok(Self::Elite),
            other => Err(PaymentError::InvalidRequest(format!("unknown plan: {other}"))),
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
