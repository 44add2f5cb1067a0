//! Rate Tables
//!
//! Process-wide pricing constants: CPM bands, niche multipliers, follower
//! floors, usage-rights multipliers and the FX rate. Built once at start-up,
//! shared behind an `Arc` and never mutated afterwards.
//!
//! Tables can be replaced wholesale from a JSON document; any field missing
//! from the document keeps its built-in value.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Advertiser CPM band and platform-specific adjustments
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRates {
    /// Low end of the CPM band (USD per 1,000 views)
    pub cpm_low_usd: Decimal,

    /// High end of the CPM band (USD per 1,000 views)
    pub cpm_high_usd: Decimal,

    /// Scales the follower floor for this platform
    #[serde(default = "unit")]
    pub floor_multiplier: Decimal,

    /// Half-width of the quoted range, as a fraction of the midpoint
    pub spread: Decimal,
}

impl PlatformRates {
    pub const fn new(
        cpm_low_usd: Decimal,
        cpm_high_usd: Decimal,
        floor_multiplier: Decimal,
        spread: Decimal,
    ) -> Self {
        Self {
            cpm_low_usd,
            cpm_high_usd,
            floor_multiplier,
            spread,
        }
    }

    /// Midpoint of the CPM band in USD
    pub fn cpm_midpoint_usd(&self) -> Decimal {
        (self.cpm_low_usd + self.cpm_high_usd) / dec!(2)
    }
}

const fn unit() -> Decimal {
    Decimal::ONE
}

/// A platform key resolved against the tables
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPlatform {
    /// Normalized key (trimmed, lower-case)
    pub key: String,

    /// CPM midpoint in USD, before the regional discount
    pub cpm_midpoint_usd: Decimal,

    pub floor_multiplier: Decimal,

    pub spread: Decimal,

    /// False when the defaults were used
    pub known: bool,
}

/// A niche key resolved against the tables
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedNiche {
    pub key: String,
    pub multiplier: Decimal,
    pub known: bool,
}

/// Complete set of pricing constants
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTables {
    /// ISO code of the local currency amounts are quoted in
    pub currency: String,

    /// Per-platform CPM bands, floor multipliers and spreads
    pub platforms: BTreeMap<String, PlatformRates>,

    /// Per-niche price multipliers
    pub niches: BTreeMap<String, Decimal>,

    /// CPM midpoint (USD) for platforms missing from `platforms`
    pub default_cpm_usd: Decimal,

    pub default_floor_multiplier: Decimal,

    pub default_spread: Decimal,

    pub default_niche_multiplier: Decimal,

    /// Flat discount applied to global CPMs for the local market
    pub regional_discount: Decimal,

    /// Local currency per 10,000 followers
    pub floor_per_10k_followers: Decimal,

    /// Local currency units per USD
    pub fx_rate: Decimal,

    /// Usage-rights duration (months) to price multiplier
    pub usage_multipliers: BTreeMap<u32, Decimal>,

    /// Usage-rights duration every quote is priced at
    pub baseline_usage_months: u32,

    /// Multiplier for durations missing from `usage_multipliers`
    pub default_usage_multiplier: Decimal,

    /// Minimum acceptable price as a fraction of the recommendation
    pub minimum_fraction: Decimal,

    /// Whitelisting (paid ad rights) premium over organic usage
    pub whitelist_multiplier: Decimal,
}

impl Default for RateTables {
    fn default() -> Self {
        let platforms = BTreeMap::from([
            ("instagram".to_string(), PlatformRates::new(dec!(12), dec!(30), dec!(1.0), dec!(0.25))),
            ("tiktok".to_string(), PlatformRates::new(dec!(8), dec!(18), dec!(0.8), dec!(0.30))),
            ("youtube".to_string(), PlatformRates::new(dec!(15), dec!(40), dec!(1.2), dec!(0.20))),
            ("twitter".to_string(), PlatformRates::new(dec!(4), dec!(10), dec!(0.6), dec!(0.35))),
            ("facebook".to_string(), PlatformRates::new(dec!(6), dec!(14), dec!(0.7), dec!(0.30))),
        ]);

        let niches = [
            ("tech", dec!(2.5)),
            ("business", dec!(2.3)),
            ("finance", dec!(2.8)),
            ("beauty", dec!(2.0)),
            ("gaming", dec!(1.8)),
            ("fitness", dec!(1.6)),
            ("lifestyle", dec!(1.4)),
            ("comedy", dec!(1.2)),
            ("education", dec!(1.5)),
            ("general", dec!(1.0)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            currency: "NGN".into(),
            platforms,
            niches,
            default_cpm_usd: dec!(10),
            default_floor_multiplier: dec!(1.0),
            default_spread: dec!(0.25),
            default_niche_multiplier: dec!(1.0),
            regional_discount: dec!(0.45),
            floor_per_10k_followers: dec!(100000),
            fx_rate: dec!(1300),
            usage_multipliers: BTreeMap::from([(3, dec!(2.0)), (6, dec!(3.0)), (12, dec!(4.0))]),
            baseline_usage_months: 3,
            default_usage_multiplier: dec!(2.0),
            minimum_fraction: dec!(0.5),
            whitelist_multiplier: dec!(2.0),
        }
    }
}

impl RateTables {
    /// Parse and validate tables from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tables: Self = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Load and validate tables from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let tables = Self::from_json_str(&raw)?;

        tracing::info!(
            path = %path.display(),
            platforms = tables.platforms.len(),
            niches = tables.niches.len(),
            "Loaded rate tables"
        );

        Ok(tables)
    }

    /// Check the invariants the valuation model relies on
    pub fn validate(&self) -> Result<()> {
        if self.fx_rate <= Decimal::ZERO {
            return Err(PricingError::Config("fx_rate must be positive".into()));
        }
        if self.default_cpm_usd <= Decimal::ZERO {
            return Err(PricingError::Config("default_cpm_usd must be positive".into()));
        }
        if self.regional_discount <= Decimal::ZERO {
            return Err(PricingError::Config("regional_discount must be positive".into()));
        }
        if self.floor_per_10k_followers <= Decimal::ZERO {
            return Err(PricingError::Config("floor_per_10k_followers must be positive".into()));
        }
        if self.minimum_fraction <= Decimal::ZERO || self.minimum_fraction > Decimal::ONE {
            return Err(PricingError::Config("minimum_fraction must be in (0, 1]".into()));
        }
        if self.whitelist_multiplier <= Decimal::ONE {
            return Err(PricingError::Config("whitelist_multiplier must be greater than 1".into()));
        }
        if !self.usage_multipliers.contains_key(&self.baseline_usage_months) {
            return Err(PricingError::Config(format!(
                "usage_multipliers has no entry for the {}-month baseline",
                self.baseline_usage_months
            )));
        }
        if self.usage_multipliers.values().any(|m| *m <= Decimal::ZERO) {
            return Err(PricingError::Config("usage multipliers must be positive".into()));
        }
        check_spread("default_spread", self.default_spread)?;
        check_multiplier("default_floor_multiplier", self.default_floor_multiplier)?;
        check_multiplier("default_niche_multiplier", self.default_niche_multiplier)?;

        for (name, rates) in &self.platforms {
            if rates.cpm_low_usd <= Decimal::ZERO || rates.cpm_low_usd > rates.cpm_high_usd {
                return Err(PricingError::Config(format!(
                    "platform {name}: CPM band must satisfy 0 < low <= high"
                )));
            }
            check_spread(name, rates.spread)?;
            check_multiplier(name, rates.floor_multiplier)?;
        }
        for (name, multiplier) in &self.niches {
            check_multiplier(name, *multiplier)?;
        }

        Ok(())
    }

    /// Resolve a platform key, falling back to the default rates
    pub fn resolve_platform(&self, raw: &str) -> ResolvedPlatform {
        let key = normalize_key(raw);

        if let Some(rates) = self.platforms.get(&key) {
            return ResolvedPlatform {
                key,
                cpm_midpoint_usd: rates.cpm_midpoint_usd(),
                floor_multiplier: rates.floor_multiplier,
                spread: rates.spread,
                known: true,
            };
        }

        tracing::debug!(platform = %key, "Unknown platform, using default rates");
        ResolvedPlatform {
            key,
            cpm_midpoint_usd: self.default_cpm_usd,
            floor_multiplier: self.default_floor_multiplier,
            spread: self.default_spread,
            known: false,
        }
    }

    /// Resolve a niche key, falling back to the default multiplier
    pub fn resolve_niche(&self, raw: &str) -> ResolvedNiche {
        let key = normalize_key(raw);

        match self.niches.get(&key) {
            Some(multiplier) => ResolvedNiche {
                key,
                multiplier: *multiplier,
                known: true,
            },
            None => {
                tracing::debug!(niche = %key, "Unknown niche, using default multiplier");
                ResolvedNiche {
                    key,
                    multiplier: self.default_niche_multiplier,
                    known: false,
                }
            }
        }
    }

    /// Usage-rights multiplier for a duration in months
    pub fn usage_multiplier(&self, months: u32) -> Decimal {
        self.usage_multipliers
            .get(&months)
            .copied()
            .unwrap_or(self.default_usage_multiplier)
    }
}

/// Trim and lower-case a platform or niche key
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_spread(name: &str, spread: Decimal) -> Result<()> {
    if spread < Decimal::ZERO || spread >= Decimal::ONE {
        return Err(PricingError::Config(format!("{name}: spread must be in [0, 1)")));
    }
    Ok(())
}

fn check_multiplier(name: &str, multiplier: Decimal) -> Result<()> {
    if multiplier <= Decimal::ZERO {
        return Err(PricingError::Config(format!("{name}: multiplier must be positive")));
    }
    Ok(())
}
