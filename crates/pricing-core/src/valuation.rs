//! Hybrid Valuation Model
//!
//! Converts audience signals into a recommended brand-deal price.
//!
//! ```text
//!   avg_views ──▶ views/1000 × CPM_mid × discount × niche × FX ──┐
//!                                                               ├─▶ base ──▶ × usage(3mo) ──▶ recommended
//!   followers ──▶ followers/10k × floor_rate × platform_floor ───┘
//! ```
//!
//! With both metrics the higher valuation wins: either one alone is already
//! a defensible floor.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::{PricingError, Result};
use crate::quote::{EffectiveMode, Quote, QuoteBasis, RangeQuote, SingleQuote, WhitelistQuote};
use crate::rates::RateTables;
use crate::request::{AudienceSignals, OutputShape, PricingRequest};

/// Stateless pricing engine over a shared set of rate tables
#[derive(Clone, Debug)]
pub struct PricingEngine {
    rates: Arc<RateTables>,
}

/// Intermediate valuation shared by both output shapes
struct Appraisal {
    basis: QuoteBasis,
    /// Usage-adjusted point estimate, whole local units
    recommended: Decimal,
    spread: Decimal,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(Arc::new(RateTables::default()))
    }
}

impl PricingEngine {
    pub const fn new(rates: Arc<RateTables>) -> Self {
        Self { rates }
    }

    /// Price a request in the shape it asks for
    pub fn price(&self, request: &PricingRequest) -> Result<Quote> {
        match request.mode {
            OutputShape::Single => self
                .calculate(&request.signals, &request.platform, &request.niche, request.is_pro)
                .map(Quote::Single),
            OutputShape::Range => self
                .calculate_range(&request.signals, &request.platform, &request.niche, request.is_pro)
                .map(Quote::Range),
        }
    }

    /// Recommended and minimum price
    pub fn calculate(
        &self,
        signals: &AudienceSignals,
        platform: &str,
        niche: &str,
        is_pro: bool,
    ) -> Result<SingleQuote> {
        let appraisal = self.appraise(signals, platform, niche, is_pro)?;
        let recommended = appraisal.recommended;
        let minimum = whole(mul(recommended, self.rates.minimum_fraction)?);

        Ok(SingleQuote {
            recommended_amount: to_amount(recommended)?,
            minimum_amount: to_amount(minimum)?,
            recommended_amount_usd: self.to_usd(recommended)?,
            whitelist: self.whitelist(recommended, is_pro)?,
            basis: appraisal.basis,
        })
    }

    /// Low / mid / high band around the recommended price
    pub fn calculate_range(
        &self,
        signals: &AudienceSignals,
        platform: &str,
        niche: &str,
        is_pro: bool,
    ) -> Result<RangeQuote> {
        let appraisal = self.appraise(signals, platform, niche, is_pro)?;
        let mid = appraisal.recommended;
        let low = whole(mul(mid, Decimal::ONE - appraisal.spread)?);
        let high = whole(mul(mid, Decimal::ONE + appraisal.spread)?);

        Ok(RangeQuote {
            range_low: to_amount(low)?,
            range_mid: to_amount(mid)?,
            range_high: to_amount(high)?,
            range_mid_usd: self.to_usd(mid)?,
            whitelist: self.whitelist(mid, is_pro)?,
            basis: appraisal.basis,
        })
    }

    fn appraise(
        &self,
        signals: &AudienceSignals,
        platform: &str,
        niche: &str,
        is_pro: bool,
    ) -> Result<Appraisal> {
        if !signals.has_audience_metric() {
            return Err(PricingError::InsufficientData);
        }
        signals.validate()?;

        let rates = &*self.rates;
        let platform = rates.resolve_platform(platform);
        let niche = rates.resolve_niche(niche);

        let localized_cpm = mul(platform.cpm_midpoint_usd, rates.regional_discount)?;

        let views_value = signals
            .views_signal()
            .map(|views| {
                let per_mille = Decimal::from(views) / dec!(1000);
                product(&[per_mille, localized_cpm, niche.multiplier, rates.fx_rate])
            })
            .transpose()?;

        let floor_value = signals
            .followers_signal()
            .map(|followers| {
                let tens_of_thousands = Decimal::from(followers) / dec!(10000);
                product(&[tens_of_thousands, rates.floor_per_10k_followers, platform.floor_multiplier])
            })
            .transpose()?;

        // Engagement does not enter the formula, so followers + views without
        // it are still priced on the full path.
        let (mode, base) = match (floor_value, views_value) {
            (Some(floor), Some(views)) => (EffectiveMode::Full, floor.max(views)),
            (Some(floor), None) => (EffectiveMode::FollowersOnly, floor),
            (None, Some(views)) => (EffectiveMode::ViewsOnly, views),
            (None, None) => return Err(PricingError::InsufficientData),
        };

        let usage_months = rates.baseline_usage_months;
        let recommended = whole(mul(base, rates.usage_multiplier(usage_months))?);

        tracing::debug!(
            mode = %mode,
            platform = %platform.key,
            niche = %niche.key,
            known_platform = platform.known,
            known_niche = niche.known,
            base = %base,
            recommended = %recommended,
            "Appraised creator"
        );

        Ok(Appraisal {
            basis: QuoteBasis {
                mode,
                platform: platform.key,
                niche: niche.key,
                followers: signals.followers,
                avg_views: signals.avg_views,
                engagement_rate: signals.engagement_rate,
                usage_months,
                is_pro,
                currency: rates.currency.clone(),
            },
            recommended,
            spread: platform.spread,
        })
    }

    /// Whitelisting figures, attached only for PRO callers
    fn whitelist(&self, recommended: Decimal, is_pro: bool) -> Result<Option<WhitelistQuote>> {
        if !is_pro {
            return Ok(None);
        }

        let amount = whole(mul(recommended, self.rates.whitelist_multiplier)?);
        Ok(Some(WhitelistQuote {
            amount: to_amount(amount)?,
            amount_usd: self.to_usd(amount)?,
        }))
    }

    fn to_usd(&self, local: Decimal) -> Result<Decimal> {
        local
            .checked_div(self.rates.fx_rate)
            .map(|usd| usd.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
            .ok_or_else(|| PricingError::Config(format!("cannot convert {local} at fx rate {}", self.rates.fx_rate)))
    }
}

/// Overflow means the rate tables hold unusable values, not bad input
fn mul(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or_else(|| PricingError::Config(format!("{lhs} x {rhs} overflows")))
}

fn product(factors: &[Decimal]) -> Result<Decimal> {
    factors.iter().try_fold(Decimal::ONE, |acc, factor| mul(acc, *factor))
}

fn whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn to_amount(value: Decimal) -> Result<u64> {
    value
        .to_u64()
        .ok_or_else(|| PricingError::Config(format!("amount {value} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::MAX_AUDIENCE;

    fn engine() -> PricingEngine {
        PricingEngine::default()
    }

    fn full_signals() -> AudienceSignals {
        AudienceSignals::new(Some(50_000), Some(12_000), Some(0.08))
    }

    #[test]
    fn test_full_mode_free_user() {
        let quote = engine().calculate(&full_signals(), "instagram", "tech", false).unwrap();

        // views: 12 × 9.45 × 2.5 × 1300 = 368,550; floor: 5 × 100,000 = 500,000
        assert_eq!(quote.basis.mode, EffectiveMode::Full);
        assert_eq!(quote.recommended_amount, 1_000_000);
        assert_eq!(quote.minimum_amount, 500_000);
        assert_eq!(quote.recommended_amount_usd, dec!(769.23));
        assert_eq!(quote.basis.usage_months, 3);
        assert!(quote.whitelist.is_none());
    }

    #[test]
    fn test_full_mode_pro_user_gets_whitelist() {
        let quote = engine().calculate(&full_signals(), "instagram", "tech", true).unwrap();
        let whitelist = quote.whitelist.unwrap();

        assert_eq!(whitelist.amount, 2_000_000);
        assert_eq!(whitelist.amount_usd, dec!(1538.46));
        assert!(whitelist.amount > quote.recommended_amount);
        assert!(quote.basis.is_pro);
    }

    #[test]
    fn test_views_win_when_higher_than_floor() {
        let signals = AudienceSignals::new(Some(10_000), Some(100_000), Some(0.05));
        let quote = engine().calculate(&signals, "youtube", "finance", false).unwrap();

        // views: 100 × 12.375 × 2.8 × 1300 = 4,504,500 vs floor 120,000
        assert_eq!(quote.basis.mode, EffectiveMode::Full);
        assert_eq!(quote.recommended_amount, 9_009_000);
    }

    #[test]
    fn test_followers_only() {
        let quote = engine()
            .calculate(&AudienceSignals::followers_only(50_000), "tiktok", "general", false)
            .unwrap();

        // 5 × 100,000 × 0.8 × 2.0
        assert_eq!(quote.basis.mode, EffectiveMode::FollowersOnly);
        assert_eq!(quote.recommended_amount, 800_000);
        assert_eq!(quote.minimum_amount, 400_000);
    }

    #[test]
    fn test_views_only() {
        let quote = engine()
            .calculate(&AudienceSignals::views_only(10_000, Some(0.05)), "youtube", "finance", false)
            .unwrap();

        assert_eq!(quote.basis.mode, EffectiveMode::ViewsOnly);
        assert_eq!(quote.recommended_amount, 900_900);
    }

    #[test]
    fn test_followers_and_views_without_engagement_price_on_full_path() {
        let signals = AudienceSignals::new(Some(50_000), Some(12_000), None);
        let quote = engine().calculate(&signals, "instagram", "tech", false).unwrap();
        assert_eq!(quote.basis.mode, EffectiveMode::Full);
        assert_eq!(quote.recommended_amount, 1_000_000);
    }

    #[test]
    fn test_insufficient_data() {
        let signals = AudienceSignals::new(None, None, Some(0.08));
        for is_pro in [false, true] {
            let err = engine().calculate(&signals, "youtube", "finance", is_pro).unwrap_err();
            assert!(matches!(err, PricingError::InsufficientData));
            let err = engine().calculate_range(&signals, "youtube", "finance", is_pro).unwrap_err();
            assert!(matches!(err, PricingError::InsufficientData));
        }

        // Out-of-range engagement does not mask the missing metrics
        let signals = AudienceSignals::new(None, None, Some(7.0));
        let err = engine().calculate(&signals, "youtube", "finance", false).unwrap_err();
        assert_eq!(err.code(), "insufficient_data");
    }

    #[test]
    fn test_invalid_input_is_distinct() {
        let signals = AudienceSignals::new(Some(1_000), None, Some(1.5));
        let err = engine().calculate(&signals, "instagram", "tech", false).unwrap_err();
        assert!(matches!(err, PricingError::InvalidInput(_)));
    }

    #[test]
    fn test_range_matches_single() {
        let engine = engine();
        let single = engine.calculate(&full_signals(), "instagram", "tech", false).unwrap();
        let range = engine.calculate_range(&full_signals(), "instagram", "tech", false).unwrap();

        assert!(range.range_low < range.range_mid);
        assert!(range.range_mid < range.range_high);
        assert_eq!(range.range_mid, single.recommended_amount);
        assert_eq!(range.range_low, 750_000);
        assert_eq!(range.range_high, 1_250_000);
        assert!(range.whitelist.is_none());
    }

    #[test]
    fn test_unknown_platform_falls_back() {
        let engine = engine();
        let signals = AudienceSignals::views_only(1_000, None);

        // 1 × (10 × 0.45) × 1.0 × 1300 × 2.0
        let single = engine.calculate(&signals, "snapchat", "general", false).unwrap();
        assert_eq!(single.recommended_amount, 11_700);
        assert_eq!(single.basis.platform, "snapchat");

        let range = engine.calculate_range(&signals, "snapchat", "astrology", false).unwrap();
        assert_eq!(range.range_low, 8_775);
        assert_eq!(range.range_high, 14_625);
        assert_eq!(range.basis.niche, "astrology");
    }

    #[test]
    fn test_deterministic() {
        let engine = engine();
        let request = PricingRequest::new(full_signals(), "instagram", "tech").pro(true);
        assert_eq!(engine.price(&request).unwrap(), engine.price(&request).unwrap());
    }

    #[test]
    fn test_monotonic_in_views() {
        let engine = engine();
        let mut previous = 0;
        for views in [1_u64, 10, 999, 1_000, 5_000, 12_000, 50_000, 250_000, 1_000_000] {
            let signals = AudienceSignals::new(Some(20_000), Some(views), Some(0.04));
            let quote = engine.calculate(&signals, "tiktok", "beauty", false).unwrap();
            assert!(quote.recommended_amount >= previous);
            previous = quote.recommended_amount;
        }
    }

    #[test]
    fn test_ordering_invariants_hold_for_small_audiences() {
        let engine = engine();
        for followers in [1_u64, 3, 17, 250, 9_999] {
            let signals = AudienceSignals::followers_only(followers);
            let single = engine.calculate(&signals, "twitter", "comedy", true).unwrap();
            let whitelist = single.whitelist.unwrap();
            assert!(single.minimum_amount <= single.recommended_amount);
            assert!(single.recommended_amount < whitelist.amount);

            let range = engine.calculate_range(&signals, "twitter", "comedy", false).unwrap();
            assert!(range.range_low <= range.range_mid);
            assert!(range.range_mid <= range.range_high);
        }
    }

    #[test]
    fn test_price_dispatches_on_shape() {
        let engine = engine();
        let request = PricingRequest::new(full_signals(), "instagram", "tech").shape(OutputShape::Range);
        let quote = engine.price(&request).unwrap();
        assert!(matches!(quote, Quote::Range(_)));
        assert_eq!(quote.recommended_amount(), 1_000_000);
        assert!(quote.whitelist().is_none());
    }

    #[test]
    fn test_range_pro_user_gets_whitelist() {
        let range = engine().calculate_range(&full_signals(), "instagram", "tech", true).unwrap();
        let whitelist = range.whitelist.unwrap();

        assert!(range.basis.is_pro);
        assert_eq!(range.range_mid, 1_000_000);
        assert_eq!(whitelist.amount, 2_000_000);
        assert_eq!(whitelist.amount_usd, dec!(1538.46));
        assert!(whitelist.amount > range.range_mid);
    }

    #[test]
    fn test_oversized_tables_fail_instead_of_panicking() {
        let mut tables = RateTables::default();
        tables.fx_rate = Decimal::from(10_000_000_000_000_000_000_u64) * dec!(1000);
        tables.validate().unwrap();
        let engine = PricingEngine::new(Arc::new(tables));

        let signals = AudienceSignals::views_only(MAX_AUDIENCE, None);
        let err = engine.calculate(&signals, "youtube", "finance", false).unwrap_err();
        assert!(matches!(err, PricingError::Config(_)));
        assert!(!err.is_caller_error());

        let err = engine.calculate_range(&signals, "youtube", "finance", true).unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn test_amount_beyond_u64_is_a_configuration_error() {
        let mut tables = RateTables::default();
        tables.fx_rate = Decimal::from(1_000_000_000_000_u64);
        let engine = PricingEngine::new(Arc::new(tables));

        // ~6.9e20 local units: representable as a Decimal, not as u64
        let signals = AudienceSignals::views_only(MAX_AUDIENCE, None);
        let err = engine.calculate(&signals, "youtube", "finance", false).unwrap_err();
        assert!(matches!(err, PricingError::Config(_)));
    }

    #[test]
    fn test_injected_tables() {
        let mut tables = RateTables::default();
        tables.whitelist_multiplier = dec!(3);
        tables.minimum_fraction = dec!(0.6);
        let engine = PricingEngine::new(Arc::new(tables));

        let quote = engine
            .calculate(&AudienceSignals::followers_only(10_000), "instagram", "general", true)
            .unwrap();
        assert_eq!(quote.recommended_amount, 200_000);
        assert_eq!(quote.minimum_amount, 120_000);
        assert_eq!(quote.whitelist.unwrap().amount, 600_000);
    }
}
